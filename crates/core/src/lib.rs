//! Steward — CDP target/session lifecycle management for agent-driven
//! browser automation.
//!
//! The browser changes underneath the agent asynchronously: tabs open
//! and close, frames crash, workers come and go. This crate keeps an
//! in-process session pool perfectly synchronized with that reality by
//! listening to Target attach/detach events, and self-heals the
//! agent's focused session when its target disappears.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │  SessionManager   │  attach/detach handlers, discovery, recovery
//! └───────┬───────────┘
//!         │ mutates under the pool lock
//! ┌───────▼───────────┐
//! │   SessionPool     │  target→session map + indices (invariants)
//! └───────────────────┘
//!         │ publishes
//! ┌───────▼───────────┐
//! │     EventBus      │  tab-created / tab-closed / focus-changed
//! └───────────────────┘
//! ```
//!
//! The wire transport is out of scope: [`CdpClient`] is the seam an
//! established connection must satisfy (command I/O plus synchronous
//! per-event-type callbacks).

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod focus;
pub mod manager;
pub mod pool;

pub use client::{CdpClient, CdpHandle, CommandFuture, EventCallback};
pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use events::{EventBus, LifecycleEvent};
pub use focus::AgentFocus;
pub use manager::SessionManager;
pub use pool::{AttachOutcome, DetachOutcome, Session, SessionPool};
