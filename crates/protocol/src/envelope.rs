//! Raw CDP message envelopes.
//!
//! A flat-mode CDP connection multiplexes every message over one
//! socket: responses carry an `id`, events carry a `method`, and both
//! may carry a `sessionId` routing them to a specific attached
//! session. These helpers classify and split incoming JSON; client
//! implementations and the test harness build on them.

use serde_json::Value;

use crate::target::SessionId;

/// An event received from the browser.
#[derive(Debug, Clone)]
pub struct CdpEvent {
	/// Event method name (e.g. `Target.attachedToTarget`).
	pub method: String,
	/// Session the event is routed to, if session-scoped.
	pub session_id: Option<SessionId>,
	/// Event parameters.
	pub params: Value,
}

/// A command response received from the browser.
#[derive(Debug, Clone)]
pub struct CdpResponse {
	/// Command id this response correlates to.
	pub id: u64,
	/// Result value on success.
	pub result: Option<Value>,
	/// Error object on failure.
	pub error: Option<CdpResponseError>,
}

/// Error object carried in a failed response.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CdpResponseError {
	pub code: i64,
	pub message: String,
	#[serde(default)]
	pub data: Option<String>,
}

/// Parses a JSON message as a command response.
///
/// Returns `None` if the message has no `id` (i.e. it is an event).
pub fn parse_response(json: &Value) -> Option<CdpResponse> {
	let id = json.get("id")?.as_u64()?;
	Some(CdpResponse {
		id,
		result: json.get("result").cloned(),
		error: json
			.get("error")
			.and_then(|e| serde_json::from_value(e.clone()).ok()),
	})
}

/// Parses a JSON message as an event.
///
/// Returns `None` for responses (messages carrying an `id`) and for
/// messages with no `method`.
pub fn parse_event(json: &Value) -> Option<CdpEvent> {
	if json.get("id").is_some() {
		return None;
	}
	let method = json.get("method")?.as_str()?.to_string();
	let session_id = json
		.get("sessionId")
		.and_then(|v| v.as_str())
		.filter(|s| !s.is_empty())
		.map(SessionId::from);
	let params = json.get("params").cloned().unwrap_or(Value::Null);
	Some(CdpEvent {
		method,
		session_id,
		params,
	})
}
