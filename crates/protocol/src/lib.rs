//! Wire types for the subset of the Chrome DevTools Protocol that the
//! steward session manager consumes and emits.
//!
//! Only the Target domain (attach/detach lifecycle) and the two Page
//! events used for keeping pooled session metadata fresh are modeled
//! here. Everything is plain serde data; no I/O lives in this crate.

pub mod envelope;
pub mod methods;
pub mod target;

pub use envelope::{CdpEvent, CdpResponse, CdpResponseError, parse_event, parse_response};
pub use target::{
	AttachToTargetResult, AttachedToTargetEvent, CreateTargetResult, DetachedFromTargetEvent,
	FrameInfo, FrameNavigatedParams, GetTargetsResult, PageLifecycleParams, SessionId, TargetId,
	TargetInfo, TargetKind,
};
