//! Protocol client seam.
//!
//! The wire transport is not implemented here; [`CdpClient`] is the
//! object-safe boundary an established CDP connection must satisfy:
//! command I/O plus one synchronous callback per event type. On top of
//! it, [`CdpHandle`] provides the typed commands the lifecycle manager
//! issues.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Value, json};
use steward_protocol::{
	AttachToTargetResult, CdpEvent, CreateTargetResult, GetTargetsResult, SessionId, TargetId,
	TargetInfo, methods,
};

use crate::error::Result;

/// Boxed future returned by [`CdpClient::send`].
pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;

/// Synchronous event callback.
///
/// Invoked on the connection's dispatch path; implementations must not
/// block. Handlers that need to do real work spawn it onto the runtime.
pub type EventCallback = Arc<dyn Fn(CdpEvent) + Send + Sync>;

/// An established CDP connection.
pub trait CdpClient: Send + Sync {
	/// Sends a command, optionally scoped to an attached session, and
	/// resolves to the raw result value.
	fn send(&self, method: &str, session_id: Option<&SessionId>, params: Value)
	-> CommandFuture<'_>;

	/// Registers the callback invoked for every event with the given
	/// method name. At most one registration per method is expected.
	fn register_event_handler(&self, method: &str, handler: EventCallback);
}

/// Typed command surface over a [`CdpClient`].
#[derive(Clone)]
pub struct CdpHandle {
	client: Arc<dyn CdpClient>,
}

impl CdpHandle {
	pub fn new(client: Arc<dyn CdpClient>) -> Self {
		Self { client }
	}

	/// Registers an event callback on the underlying connection.
	pub fn on_event(&self, method: &str, handler: EventCallback) {
		self.client.register_event_handler(method, handler);
	}

	/// Enumerates all targets known to the browser.
	pub async fn get_targets(&self) -> Result<Vec<TargetInfo>> {
		let result = self.client.send(methods::GET_TARGETS, None, json!({})).await?;
		let result: GetTargetsResult = serde_json::from_value(result)?;
		Ok(result.target_infos)
	}

	/// Attaches to a target in flat session mode.
	pub async fn attach_to_target(&self, target_id: &TargetId) -> Result<SessionId> {
		let result = self
			.client
			.send(
				methods::ATTACH_TO_TARGET,
				None,
				json!({ "targetId": target_id, "flatten": true }),
			)
			.await?;
		let result: AttachToTargetResult = serde_json::from_value(result)?;
		Ok(result.session_id)
	}

	/// Opens a new page target at the given URL.
	pub async fn create_target(&self, url: &str) -> Result<TargetId> {
		let result = self
			.client
			.send(methods::CREATE_TARGET, None, json!({ "url": url }))
			.await?;
		let result: CreateTargetResult = serde_json::from_value(result)?;
		Ok(result.target_id)
	}

	/// Brings a tab to the foreground.
	pub async fn activate_target(&self, target_id: &TargetId) -> Result<()> {
		self.client
			.send(
				methods::ACTIVATE_TARGET,
				None,
				json!({ "targetId": target_id }),
			)
			.await?;
		Ok(())
	}

	/// Enables auto-attach to the session's child targets.
	pub async fn set_auto_attach(&self, session_id: &SessionId) -> Result<()> {
		self.client
			.send(
				methods::SET_AUTO_ATTACH,
				Some(session_id),
				json!({
					"autoAttach": true,
					"waitForDebuggerOnStart": false,
					"flatten": true,
				}),
			)
			.await?;
		Ok(())
	}

	/// Resumes a target paused waiting for a debugger.
	pub async fn run_if_waiting_for_debugger(&self, session_id: &SessionId) -> Result<()> {
		self.client
			.send(methods::RUN_IF_WAITING_FOR_DEBUGGER, Some(session_id), json!({}))
			.await?;
		Ok(())
	}

	/// Enables page lifecycle events for the session.
	pub async fn set_lifecycle_events_enabled(&self, session_id: &SessionId) -> Result<()> {
		self.client
			.send(
				methods::SET_LIFECYCLE_EVENTS_ENABLED,
				Some(session_id),
				json!({ "enabled": true }),
			)
			.await?;
		Ok(())
	}

	/// Enables network monitoring for the session.
	pub async fn enable_network(&self, session_id: &SessionId) -> Result<()> {
		self.client
			.send(methods::NETWORK_ENABLE, Some(session_id), json!({}))
			.await?;
		Ok(())
	}
}
