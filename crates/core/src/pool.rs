//! Session pool bookkeeping.
//!
//! [`SessionPool`] owns every map the lifecycle manager maintains:
//! the target-to-session pool itself, the per-target session sets that
//! drive removal, the session-to-target reverse index, and the
//! write-once target kind cache. All mutation goes through
//! [`SessionPool::record_attach`] and [`SessionPool::record_detach`],
//! which keep the maps consistent as a unit:
//!
//! - a target is tracked iff its session set is non-empty iff it has a
//!   pool entry;
//! - every reverse-index entry points at a target whose session set
//!   contains that session;
//! - a target's kind is cached at most once and never overwritten.
//!
//! The struct is synchronous; the manager wraps it in the pool mutex.

use std::collections::{HashMap, HashSet, VecDeque};

use steward_protocol::{AttachedToTargetEvent, PageLifecycleParams, SessionId, TargetId, TargetKind};

/// Read-only session handle handed to collaborators.
///
/// `session_id` is last-write-wins: re-attachment overwrites it in the
/// pooled entry. `title` and `url` are refreshed only when the newer
/// event actually carries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub target_id: TargetId,
	pub session_id: SessionId,
	pub title: String,
	pub url: String,
}

/// Recent page lifecycle events are kept per target for navigation
/// code to consume; the ring is bounded so idle tabs cannot grow it.
const LIFECYCLE_RING_CAPACITY: usize = 50;

/// Outcome of recording an attach event.
#[derive(Debug, Clone)]
pub struct AttachOutcome {
	/// True if this attach created the pool entry (first session for
	/// the target), false if it updated an existing entry in place.
	pub created: bool,
	pub kind: TargetKind,
	pub session: Session,
}

/// Outcome of recording a detach event.
#[derive(Debug, Clone)]
pub enum DetachOutcome {
	/// No target id on the event and no reverse-mapping hit; nothing
	/// was mutated.
	Unresolved,
	/// The target was not tracked (attach event missed or target
	/// already removed); only the reverse mapping was cleaned.
	UntrackedTarget { target_id: TargetId },
	/// Other sessions remain attached; the pool entry survives.
	Partial {
		target_id: TargetId,
		remaining: usize,
	},
	/// The last session detached; pool entry and all bookkeeping for
	/// the target were removed.
	FullRemoval {
		target_id: TargetId,
		kind: Option<TargetKind>,
	},
}

/// The single shared mutable resource: target id to session, plus the
/// auxiliary indices that drive attach/detach decisions.
#[derive(Default)]
pub struct SessionPool {
	sessions: HashMap<TargetId, Session>,
	target_sessions: HashMap<TargetId, HashSet<SessionId>>,
	session_to_target: HashMap<SessionId, TargetId>,
	target_kinds: HashMap<TargetId, TargetKind>,
	lifecycle_events: HashMap<TargetId, VecDeque<PageLifecycleParams>>,
}

impl SessionPool {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records an attach event.
	///
	/// First attach for a target creates the pool entry; subsequent
	/// attaches overwrite `session_id` in place (last write wins) and
	/// refresh `title`/`url` when non-empty, never duplicating the
	/// entry.
	pub fn record_attach(&mut self, event: &AttachedToTargetEvent) -> AttachOutcome {
		let target_id = event.target_info.target_id.clone();
		let session_id = event.session_id.clone();
		let kind = event.target_info.kind;

		self.target_sessions
			.entry(target_id.clone())
			.or_default()
			.insert(session_id.clone());
		self.session_to_target
			.insert(session_id.clone(), target_id.clone());

		// Kind is observed once and immutable thereafter.
		self.target_kinds.entry(target_id.clone()).or_insert(kind);

		let created = !self.sessions.contains_key(&target_id);
		let session = if created {
			let url = if event.target_info.url.is_empty() {
				"about:blank".to_string()
			} else {
				event.target_info.url.clone()
			};
			let session = Session {
				target_id: target_id.clone(),
				session_id,
				title: event.target_info.title.clone(),
				url,
			};
			self.sessions.insert(target_id, session.clone());
			session
		} else {
			let existing = self
				.sessions
				.get_mut(&target_id)
				.expect("pool entry exists when created is false");
			existing.session_id = session_id;
			if !event.target_info.title.is_empty() {
				existing.title = event.target_info.title.clone();
			}
			if !event.target_info.url.is_empty() {
				existing.url = event.target_info.url.clone();
			}
			existing.clone()
		};

		AttachOutcome {
			created,
			kind: self.target_kinds[&session.target_id],
			session,
		}
	}

	/// Records a detach event.
	///
	/// The target is resolved from the event's target id when present,
	/// otherwise through the reverse index. An unresolvable detach
	/// mutates nothing. The pool entry is removed only when the last
	/// session for the target detaches.
	pub fn record_detach(
		&mut self,
		session_id: &SessionId,
		event_target_id: Option<&TargetId>,
	) -> DetachOutcome {
		let target_id = match event_target_id
			.filter(|id| !id.is_empty())
			.cloned()
			.or_else(|| self.session_to_target.get(session_id).cloned())
		{
			Some(id) => id,
			None => return DetachOutcome::Unresolved,
		};

		self.session_to_target.remove(session_id);

		let Some(sessions) = self.target_sessions.get_mut(&target_id) else {
			return DetachOutcome::UntrackedTarget { target_id };
		};
		sessions.remove(session_id);
		let remaining = sessions.len();

		if remaining > 0 {
			return DetachOutcome::Partial {
				target_id,
				remaining,
			};
		}

		self.target_sessions.remove(&target_id);
		self.sessions.remove(&target_id);
		self.lifecycle_events.remove(&target_id);
		let kind = self.target_kinds.remove(&target_id);

		DetachOutcome::FullRemoval { target_id, kind }
	}

	/// Lock-protected read used by collaborators (snapshot clone).
	pub fn get(&self, target_id: &TargetId) -> Option<Session> {
		self.sessions.get(target_id).cloned()
	}

	pub fn contains(&self, target_id: &TargetId) -> bool {
		self.sessions.contains_key(target_id)
	}

	/// True iff the target is tracked with at least one attached
	/// session.
	pub fn is_valid(&self, target_id: &TargetId) -> bool {
		self.target_sessions
			.get(target_id)
			.is_some_and(|s| !s.is_empty())
	}

	pub fn target_for_session(&self, session_id: &SessionId) -> Option<TargetId> {
		self.session_to_target.get(session_id).cloned()
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}

	/// Overwrites the pooled URL after a main-frame navigation.
	/// Returns the previous URL if the entry existed and changed.
	pub fn update_url(&mut self, target_id: &TargetId, url: &str) -> Option<String> {
		let session = self.sessions.get_mut(target_id)?;
		if session.url == url {
			return None;
		}
		let old = std::mem::replace(&mut session.url, url.to_string());
		Some(old)
	}

	/// Appends a lifecycle event to the target's bounded ring.
	pub fn push_lifecycle_event(&mut self, target_id: &TargetId, event: PageLifecycleParams) {
		if !self.sessions.contains_key(target_id) {
			return;
		}
		let ring = self.lifecycle_events.entry(target_id.clone()).or_default();
		if ring.len() == LIFECYCLE_RING_CAPACITY {
			ring.pop_front();
		}
		ring.push_back(event);
	}

	/// Snapshot of the target's recent lifecycle events, oldest first.
	pub fn recent_lifecycle_events(&self, target_id: &TargetId) -> Vec<PageLifecycleParams> {
		self.lifecycle_events
			.get(target_id)
			.map(|ring| ring.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Wipes all bookkeeping.
	pub fn clear(&mut self) {
		self.sessions.clear();
		self.target_sessions.clear();
		self.session_to_target.clear();
		self.target_kinds.clear();
		self.lifecycle_events.clear();
	}
}
