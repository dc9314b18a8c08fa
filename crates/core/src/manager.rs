//! Event-driven CDP target/session lifecycle management.
//!
//! [`SessionManager`] listens to `Target.attachedToTarget` and
//! `Target.detachedFromTarget` and keeps the session pool synchronized
//! with live browser state:
//!
//! - sessions are added/removed only by the attach/detach handlers;
//! - multiple sessions may attach to the same target, and a target is
//!   removed only when all of them detach;
//! - when the target holding agent focus disappears, a bounded
//!   two-tier recovery re-points the focus at a usable target.
//!
//! Event callbacks are synchronous and spawn their handler as a
//! detached task, so protocol dispatch never blocks on handler
//! completion. Bookkeeping uses a short-held pool mutex; recovery uses
//! its own mutex and never holds the pool mutex across I/O.

use std::sync::Arc;

use serde_json::Value;
use steward_protocol::{
	AttachedToTargetEvent, DetachedFromTargetEvent, FrameNavigatedParams, PageLifecycleParams,
	SessionId, TargetId, methods,
};
use tokio::sync::{Mutex, broadcast};

use crate::client::{CdpClient, CdpHandle};
use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::events::{EventBus, LifecycleEvent};
use crate::focus::AgentFocus;
use crate::pool::{DetachOutcome, Session, SessionPool};

/// Event-driven session manager.
///
/// Owns the session pool; collaborators only ever see cloned
/// [`Session`] handles and published [`LifecycleEvent`]s.
pub struct SessionManager {
	client: CdpHandle,
	pool: Mutex<SessionPool>,
	/// Serializes recovery attempts so concurrent focus losses cannot
	/// each create a replacement tab. Routine bookkeeping never takes
	/// this lock.
	recovery: Mutex<()>,
	focus: AgentFocus,
	bus: EventBus,
	config: MonitorConfig,
}

impl SessionManager {
	pub fn new(
		client: Arc<dyn CdpClient>,
		focus: AgentFocus,
		bus: EventBus,
		config: MonitorConfig,
	) -> Self {
		Self {
			client: CdpHandle::new(client),
			pool: Mutex::new(SessionPool::new()),
			recovery: Mutex::new(()),
			focus,
			bus,
			config,
		}
	}

	/// Starts monitoring target attach/detach events, then discovers
	/// and attaches to all pre-existing targets.
	///
	/// # Errors
	///
	/// Fails only if the protocol client itself is unavailable (target
	/// enumeration rejected). Per-target setup failures and discovery
	/// timeouts are absorbed and logged.
	pub async fn start_monitoring(self: &Arc<Self>) -> Result<()> {
		let mgr = Arc::clone(self);
		self.client.on_event(
			methods::ATTACHED_TO_TARGET,
			Arc::new(move |event| {
				let Some(event) = parse_params::<AttachedToTargetEvent>(&event.params) else {
					return;
				};
				let mgr = Arc::clone(&mgr);
				tokio::spawn(async move {
					mgr.handle_target_attached(event).await;
				});
			}),
		);

		let mgr = Arc::clone(self);
		self.client.on_event(
			methods::DETACHED_FROM_TARGET,
			Arc::new(move |event| {
				let Some(event) = parse_params::<DetachedFromTargetEvent>(&event.params) else {
					return;
				};
				let mgr = Arc::clone(&mgr);
				tokio::spawn(async move {
					mgr.handle_target_detached(event).await;
				});
			}),
		);

		let mgr = Arc::clone(self);
		self.client.on_event(
			methods::LIFECYCLE_EVENT,
			Arc::new(move |event| {
				let Some(session_id) = event.session_id else {
					return;
				};
				let Some(params) = parse_params::<PageLifecycleParams>(&event.params) else {
					return;
				};
				let mgr = Arc::clone(&mgr);
				tokio::spawn(async move {
					mgr.handle_lifecycle_event(session_id, params).await;
				});
			}),
		);

		let mgr = Arc::clone(self);
		self.client.on_event(
			methods::FRAME_NAVIGATED,
			Arc::new(move |event| {
				let Some(session_id) = event.session_id else {
					return;
				};
				let Some(params) = parse_params::<FrameNavigatedParams>(&event.params) else {
					return;
				};
				let mgr = Arc::clone(&mgr);
				tokio::spawn(async move {
					mgr.handle_frame_navigated(session_id, params).await;
				});
			}),
		);

		tracing::debug!("event monitoring started");

		self.initialize_existing_targets().await
	}

	/// Returns the current session for a target, if it is tracked.
	pub async fn get_session(&self, target_id: &TargetId) -> Option<Session> {
		self.pool.lock().await.get(target_id)
	}

	/// True iff the target is tracked with at least one attached
	/// session.
	pub async fn is_target_valid(&self, target_id: &TargetId) -> bool {
		self.pool.lock().await.is_valid(target_id)
	}

	/// Number of pooled targets.
	pub async fn pool_size(&self) -> usize {
		self.pool.lock().await.len()
	}

	/// Snapshot of a target's recent page lifecycle events.
	pub async fn recent_lifecycle_events(&self, target_id: &TargetId) -> Vec<PageLifecycleParams> {
		self.pool.lock().await.recent_lifecycle_events(target_id)
	}

	/// Wipes all session tracking (shutdown).
	pub async fn clear(&self) {
		self.pool.lock().await.clear();
		tracing::info!("cleared all session tracking");
	}

	/// Subscribes to published lifecycle events.
	pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
		self.bus.subscribe()
	}

	/// The shared agent focus handle.
	pub fn focus(&self) -> &AgentFocus {
		&self.focus
	}

	async fn handle_target_attached(&self, event: AttachedToTargetEvent) {
		let target_id = event.target_info.target_id.clone();
		let session_id = event.session_id.clone();
		let kind = event.target_info.kind;

		tracing::debug!(
			target_id = %target_id,
			session_id = %session_id,
			kind = %kind,
			waiting_for_debugger = event.waiting_for_debugger,
			"target attached"
		);

		// Enable auto-attach for this session's children first, outside
		// the pool lock.
		if let Err(e) = self.client.set_auto_attach(&session_id).await {
			if e.is_session_gone() {
				tracing::debug!(
					session_id = %session_id,
					kind = %kind,
					"auto-attach skipped, session already detached"
				);
			} else {
				tracing::warn!(session_id = %session_id, error = %e, "auto-attach failed");
			}
		}

		{
			let mut pool = self.pool.lock().await;
			let outcome = pool.record_attach(&event);
			if outcome.created {
				tracing::debug!(
					target_id = %target_id,
					pool_size = pool.len(),
					"created session for target"
				);
				// Exactly once per pool entry; repeating this on every
				// attach would duplicate event subscriptions.
				if outcome.kind.is_page() {
					self.enable_page_monitoring(&outcome.session).await;
				}
			}
		}

		if event.waiting_for_debugger {
			match self.client.run_if_waiting_for_debugger(&session_id).await {
				Ok(()) => tracing::debug!(session_id = %session_id, "resumed execution"),
				Err(e) => {
					tracing::warn!(session_id = %session_id, error = %e, "failed to resume execution");
				}
			}
		}
	}

	async fn handle_target_detached(&self, event: DetachedFromTargetEvent) {
		let session_id = event.session_id.clone();

		let (outcome, focus_lost) = {
			let mut pool = self.pool.lock().await;
			let outcome = pool.record_detach(&session_id, event.target_id());
			let focus_lost = matches!(
				&outcome,
				DetachOutcome::FullRemoval { target_id, .. } if self.focus.is_focused(target_id)
			);
			(outcome, focus_lost)
		};

		match &outcome {
			DetachOutcome::Unresolved => {
				// Never guess, never mutate state on ambiguous input.
				tracing::warn!(
					session_id = %session_id,
					"session detached but target unknown, dropping event"
				);
				return;
			}
			DetachOutcome::UntrackedTarget { target_id } => {
				tracing::debug!(
					target_id = %target_id,
					session_id = %session_id,
					"session detached from untracked target"
				);
			}
			DetachOutcome::Partial {
				target_id,
				remaining,
			} => {
				tracing::debug!(
					target_id = %target_id,
					session_id = %session_id,
					remaining,
					"session detached, target still has sessions"
				);
			}
			DetachOutcome::FullRemoval { target_id, kind } => {
				tracing::debug!(
					target_id = %target_id,
					session_id = %session_id,
					"no sessions remain, removed target from pool"
				);
				// Only whole-tab lifecycle matters to collaborators.
				match kind {
					Some(k) if k.is_page() => {
						self.bus.publish(LifecycleEvent::TabClosed {
							target_id: target_id.clone(),
						});
					}
					Some(k) => {
						tracing::debug!(
							target_id = %target_id,
							kind = %k,
							"target fully removed, not a tab, no event published"
						);
					}
					None => {}
				}
			}
		}

		if focus_lost {
			if let DetachOutcome::FullRemoval { target_id, .. } = outcome {
				// Outside the pool lock so unrelated target events are
				// never blocked behind a multi-second recovery.
				self.recover_agent_focus(&target_id).await;
			}
		}
	}

	/// Re-points agent focus after its target crashed or detached.
	///
	/// Best-effort convergence with two fallback tiers: prefer the most
	/// recently listed existing page, else create a blank one; if no
	/// session materializes within the deadline, create one emergency
	/// fallback tab and poll once more. Never returns an error.
	async fn recover_agent_focus(&self, crashed_target_id: &TargetId) {
		let _guard = self.recovery.lock().await;

		// A concurrent recovery may already have repaired the focus.
		if let Some(current) = self.focus.get() {
			if current.target_id != *crashed_target_id {
				tracing::debug!(
					target_id = %current.target_id,
					"agent focus already recovered by concurrent operation, skipping"
				);
				return;
			}
		}

		tracing::warn!(
			target_id = %crashed_target_id,
			"agent focus target detached, recovering"
		);

		let pages = match self.client.get_targets().await {
			Ok(targets) => targets
				.into_iter()
				.filter(|t| t.kind.is_page())
				.collect::<Vec<_>>(),
			Err(e) => {
				tracing::error!(error = %e, "failed to enumerate targets during recovery");
				return;
			}
		};

		let (new_target_id, is_existing_tab) = match pages.last() {
			Some(info) => {
				tracing::info!(
					target_id = %info.target_id,
					"switching agent focus to existing tab"
				);
				(info.target_id.clone(), true)
			}
			None => {
				tracing::warn!("no tabs remain, creating new tab for agent");
				let target_id = match self.client.create_target("about:blank").await {
					Ok(id) => id,
					Err(e) => {
						tracing::error!(error = %e, "failed to create replacement tab");
						return;
					}
				};
				// Let watchdogs initialize against the new tab.
				self.bus.publish(LifecycleEvent::TabCreated {
					target_id: target_id.clone(),
					url: "about:blank".to_string(),
				});
				(target_id, false)
			}
		};

		// The attach handler produces the session asynchronously.
		if let Some(session) = self.wait_for_session(&new_target_id).await {
			self.focus.set(session.clone());
			tracing::info!(target_id = %new_target_id, "agent focus recovered");

			if is_existing_tab {
				if let Err(e) = self.client.activate_target(&new_target_id).await {
					tracing::debug!(error = %e, "failed to activate recovered tab");
				}
			}

			self.bus.publish(LifecycleEvent::AgentFocusChanged {
				target_id: new_target_id,
				url: session.url,
			});
			return;
		}

		tracing::error!(
			target_id = %new_target_id,
			timeout_ms = self.config.recovery_timeout.as_millis() as u64,
			"no session materialized for replacement target, creating emergency fallback tab"
		);

		let fallback_id = match self.client.create_target("about:blank").await {
			Ok(id) => id,
			Err(e) => {
				tracing::error!(error = %e, "failed to create emergency fallback tab");
				return;
			}
		};
		tracing::warn!(target_id = %fallback_id, "created emergency fallback tab");

		if let Some(session) = self.wait_for_session(&fallback_id).await {
			self.focus.set(session.clone());
			tracing::warn!(
				target_id = %fallback_id,
				"agent focus set to emergency fallback"
			);
			self.bus.publish(LifecycleEvent::TabCreated {
				target_id: fallback_id.clone(),
				url: "about:blank".to_string(),
			});
			self.bus.publish(LifecycleEvent::AgentFocusChanged {
				target_id: fallback_id,
				url: session.url,
			});
			return;
		}

		// Terminal: focus stays on the detached target; callers must
		// detect the invalid focus externally.
		tracing::error!(
			target_id = %crashed_target_id,
			"failed to recover agent focus even with fallback, focus left on detached target"
		);
	}

	/// Bounded poll for a session to appear in the pool.
	async fn wait_for_session(&self, target_id: &TargetId) -> Option<Session> {
		let deadline = tokio::time::Instant::now() + self.config.recovery_timeout;
		loop {
			if let Some(session) = self.get_session(target_id).await {
				return Some(session);
			}
			if tokio::time::Instant::now() >= deadline {
				return None;
			}
			tokio::time::sleep(self.config.recovery_poll_interval).await;
		}
	}

	/// Discovers pre-existing targets and attaches to each.
	///
	/// The attach requests are fire-and-forget; the attach handler does
	/// the real setup asynchronously, so this polls until every
	/// requested target has a pool entry. Timing out is non-fatal.
	async fn initialize_existing_targets(&self) -> Result<()> {
		let targets = self
			.client
			.get_targets()
			.await
			.map_err(|e| Error::ClientUnavailable(e.to_string()))?;

		tracing::debug!(count = targets.len(), "discovered existing targets");

		let mut requested: Vec<TargetId> = Vec::new();
		for info in &targets {
			match self.client.attach_to_target(&info.target_id).await {
				Ok(_) => {
					tracing::debug!(
						target_id = %info.target_id,
						kind = %info.kind,
						"attached to existing target"
					);
					requested.push(info.target_id.clone());
				}
				Err(e) => {
					tracing::debug!(
						target_id = %info.target_id,
						kind = %info.kind,
						error = %e,
						"failed to attach to existing target"
					);
				}
			}
		}

		let deadline = tokio::time::Instant::now() + self.config.discovery_timeout;
		loop {
			let ready = {
				let pool = self.pool.lock().await;
				requested.iter().filter(|t| pool.contains(t)).count()
			};
			if ready == requested.len() {
				tracing::debug!(sessions = ready, "all discovered sessions initialized");
				return Ok(());
			}
			if tokio::time::Instant::now() >= deadline {
				tracing::warn!(
					ready,
					requested = requested.len(),
					"discovery timeout, some targets may have detached during initialization"
				);
				return Ok(());
			}
			tokio::time::sleep(self.config.discovery_poll_interval).await;
		}
	}

	/// Enables page lifecycle and network events for a new page/tab
	/// pool entry.
	async fn enable_page_monitoring(&self, session: &Session) {
		let result = async {
			self.client
				.set_lifecycle_events_enabled(&session.session_id)
				.await?;
			self.client.enable_network(&session.session_id).await?;
			Ok::<_, Error>(())
		}
		.await;

		match result {
			Ok(()) => {
				tracing::debug!(
					target_id = %session.target_id,
					"enabled lifecycle and network monitoring"
				);
			}
			Err(e) if e.is_session_gone() => {
				tracing::debug!(
					target_id = %session.target_id,
					"target detached before monitoring could be enabled"
				);
			}
			Err(e) => {
				tracing::warn!(
					target_id = %session.target_id,
					error = %e,
					"failed to enable page monitoring"
				);
			}
		}
	}

	async fn handle_lifecycle_event(&self, session_id: SessionId, params: PageLifecycleParams) {
		let mut pool = self.pool.lock().await;
		if let Some(target_id) = pool.target_for_session(&session_id) {
			pool.push_lifecycle_event(&target_id, params);
		}
	}

	/// Keeps the pooled URL fresh across navigations. Only main-frame
	/// commits count; iframe navigations are ignored.
	async fn handle_frame_navigated(&self, session_id: SessionId, params: FrameNavigatedParams) {
		if !params.frame.is_main_frame() {
			return;
		}
		let mut pool = self.pool.lock().await;
		let Some(target_id) = pool.target_for_session(&session_id) else {
			return;
		};
		if let Some(old) = pool.update_url(&target_id, &params.frame.url) {
			tracing::debug!(
				target_id = %target_id,
				old_url = %old,
				new_url = %params.frame.url,
				"updated target url after navigation"
			);
		}
	}
}

/// Parses event params, logging and dropping malformed payloads.
fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Option<T> {
	match serde_json::from_value(params.clone()) {
		Ok(parsed) => Some(parsed),
		Err(e) => {
			tracing::warn!(error = %e, "malformed event payload, dropping");
			None
		}
	}
}
