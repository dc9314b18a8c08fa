//! Target-domain types: identifiers, target metadata, and the
//! attach/detach event payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque browser-assigned target identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for TargetId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for TargetId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

/// Opaque browser-assigned session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for SessionId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

/// What kind of browser surface a target is.
///
/// Observed once at attach time and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
	Page,
	Tab,
	Iframe,
	Worker,
	/// Forward-compatible catch-all for target types we do not track
	/// specially (service workers, browser, webview, ...).
	#[serde(other)]
	Other,
}

impl TargetKind {
	/// Page and tab targets carry whole-tab lifecycle semantics;
	/// everything else is an auxiliary surface.
	pub fn is_page(self) -> bool {
		matches!(self, TargetKind::Page | TargetKind::Tab)
	}
}

impl fmt::Display for TargetKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TargetKind::Page => "page",
			TargetKind::Tab => "tab",
			TargetKind::Iframe => "iframe",
			TargetKind::Worker => "worker",
			TargetKind::Other => "other",
		};
		f.write_str(s)
	}
}

/// Target metadata as reported by the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
	pub target_id: TargetId,
	#[serde(rename = "type")]
	pub kind: TargetKind,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub url: String,
}

/// `Target.attachedToTarget` event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedToTargetEvent {
	pub session_id: SessionId,
	pub target_info: TargetInfo,
	#[serde(default)]
	pub waiting_for_debugger: bool,
}

/// `Target.detachedFromTarget` event payload.
///
/// The `targetId` field is optional on the wire and may also arrive as
/// an empty string; [`Self::target_id`] normalizes both to `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedFromTargetEvent {
	pub session_id: SessionId,
	#[serde(default)]
	target_id: Option<TargetId>,
}

impl DetachedFromTargetEvent {
	pub fn new(session_id: SessionId, target_id: Option<TargetId>) -> Self {
		Self {
			session_id,
			target_id,
		}
	}

	/// The target id carried by the event, if it carried a usable one.
	pub fn target_id(&self) -> Option<&TargetId> {
		self.target_id.as_ref().filter(|id| !id.is_empty())
	}
}

/// `Target.getTargets` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsResult {
	#[serde(default)]
	pub target_infos: Vec<TargetInfo>,
}

/// `Target.attachToTarget` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetResult {
	pub session_id: SessionId,
}

/// `Target.createTarget` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetResult {
	pub target_id: TargetId,
}

/// `Page.lifecycleEvent` parameters (subset we record).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLifecycleParams {
	pub name: String,
	#[serde(default)]
	pub loader_id: Option<String>,
}

/// Frame metadata inside `Page.frameNavigated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
	pub id: String,
	#[serde(default)]
	pub parent_id: Option<String>,
	#[serde(default)]
	pub url: String,
}

impl FrameInfo {
	/// Main frames have no parent.
	pub fn is_main_frame(&self) -> bool {
		self.parent_id.is_none()
	}
}

/// `Page.frameNavigated` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameNavigatedParams {
	pub frame: FrameInfo,
}
