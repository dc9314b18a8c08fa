//! Error types for the steward core.

use thiserror::Error;

/// Result type alias for steward operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum Error {
	/// The protocol client is gone or was never connected.
	#[error("CDP client unavailable: {0}")]
	ClientUnavailable(String),

	/// The browser rejected a command.
	#[error("CDP error {code}: {message}")]
	Cdp { code: i64, message: String },

	/// Deadline expired waiting for an operation.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,
}

/// CDP error code the browser returns for commands addressed to a
/// session that has already detached.
const SESSION_NOT_FOUND: i64 = -32001;

impl Error {
	/// Returns true if this error means the addressed session is
	/// already gone. Expected for short-lived targets (workers, temp
	/// iframes) that detach before setup commands reach them.
	pub fn is_session_gone(&self) -> bool {
		match self {
			Error::Cdp { code, message } => {
				*code == SESSION_NOT_FOUND || message.contains("Session with given id not found")
			}
			_ => false,
		}
	}
}

impl From<steward_protocol::CdpResponseError> for Error {
	fn from(err: steward_protocol::CdpResponseError) -> Self {
		Error::Cdp {
			code: err.code,
			message: err.message,
		}
	}
}
