//! Published lifecycle events.
//!
//! The manager emits high-level events onto a broadcast bus; reactive
//! collaborators (watchdogs) subscribe to them. Only whole-tab
//! lifecycle matters to collaborators: iframe/worker removals and
//! partial detaches are never published.

use steward_protocol::TargetId;
use tokio::sync::broadcast;

/// High-level event published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
	/// A new page target was opened on the agent's behalf.
	TabCreated { target_id: TargetId, url: String },
	/// A page/tab target fully detached.
	TabClosed { target_id: TargetId },
	/// Agent focus moved to a different session.
	AgentFocusChanged { target_id: TargetId, url: String },
}

const DEFAULT_BUS_CAPACITY: usize = 128;

/// Publish/subscribe bus for [`LifecycleEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	tx: broadcast::Sender<LifecycleEvent>,
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_BUS_CAPACITY)
	}
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);
		Self { tx }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
		self.tx.subscribe()
	}

	/// Publishes an event. With no subscribers this is a no-op.
	pub fn publish(&self, event: LifecycleEvent) {
		tracing::trace!(?event, "publishing lifecycle event");
		let _ = self.tx.send(event);
	}
}
