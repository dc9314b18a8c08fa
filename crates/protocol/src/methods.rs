//! CDP method and event names used by the session manager.

/// Enable auto-attach to a session's child targets.
pub const SET_AUTO_ATTACH: &str = "Target.setAutoAttach";
/// Enumerate all targets known to the browser.
pub const GET_TARGETS: &str = "Target.getTargets";
/// Attach to a target in flat session mode.
pub const ATTACH_TO_TARGET: &str = "Target.attachToTarget";
/// Bring a tab to the foreground.
pub const ACTIVATE_TARGET: &str = "Target.activateTarget";
/// Open a new page target.
pub const CREATE_TARGET: &str = "Target.createTarget";
/// Resume a target paused waiting for a debugger.
pub const RUN_IF_WAITING_FOR_DEBUGGER: &str = "Runtime.runIfWaitingForDebugger";
/// Enable page lifecycle events (load, DOMContentLoaded, networkIdle, ...).
pub const SET_LIFECYCLE_EVENTS_ENABLED: &str = "Page.setLifecycleEventsEnabled";
/// Enable network monitoring for a session.
pub const NETWORK_ENABLE: &str = "Network.enable";

/// Fired when a session attaches to a target.
pub const ATTACHED_TO_TARGET: &str = "Target.attachedToTarget";
/// Fired when a session detaches from a target.
pub const DETACHED_FROM_TARGET: &str = "Target.detachedFromTarget";
/// Fired on page lifecycle transitions.
pub const LIFECYCLE_EVENT: &str = "Page.lifecycleEvent";
/// Fired when a frame commits a navigation.
pub const FRAME_NAVIGATED: &str = "Page.frameNavigated";
