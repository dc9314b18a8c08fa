//! Agent focus pointer.
//!
//! The enclosing session object owns which [`Session`] the agent is
//! currently driving; the lifecycle manager holds a clone of the
//! handle so it can re-point the focus during recovery.

use std::sync::Arc;

use parking_lot::Mutex;
use steward_protocol::TargetId;

use crate::pool::Session;

/// Shared handle to the focused session.
#[derive(Clone, Default)]
pub struct AgentFocus {
	inner: Arc<Mutex<Option<Session>>>,
}

impl AgentFocus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Snapshot of the focused session, if any.
	pub fn get(&self) -> Option<Session> {
		self.inner.lock().clone()
	}

	pub fn set(&self, session: Session) {
		*self.inner.lock() = Some(session);
	}

	pub fn clear(&self) {
		*self.inner.lock() = None;
	}

	/// True iff the focus currently points at the given target.
	pub fn is_focused(&self, target_id: &TargetId) -> bool {
		self.inner
			.lock()
			.as_ref()
			.is_some_and(|s| s.target_id == *target_id)
	}

	pub fn target_id(&self) -> Option<TargetId> {
		self.inner.lock().as_ref().map(|s| s.target_id.clone())
	}
}
