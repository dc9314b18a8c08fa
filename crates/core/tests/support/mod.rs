#![allow(dead_code)]

//! In-memory browser stand-in for lifecycle tests.
//!
//! Implements [`CdpClient`] over a table of fake targets. Commands are
//! answered synchronously; attach/detach events are fired through the
//! registered callbacks exactly like a flat-mode CDP connection would.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use steward::client::{CdpClient, CommandFuture, EventCallback};
use steward::{AgentFocus, Error, EventBus, MonitorConfig, SessionManager};
use steward_protocol::{CdpEvent, SessionId, methods};

/// A recorded command, for assertions.
#[derive(Debug, Clone)]
pub struct RecordedCommand {
	pub method: String,
	pub session_id: Option<String>,
	pub params: Value,
}

struct FakeTarget {
	target_id: String,
	kind: String,
	url: String,
}

#[derive(Default)]
struct Inner {
	handlers: Mutex<HashMap<String, Vec<EventCallback>>>,
	/// Insertion-ordered so "most recently listed" is deterministic.
	targets: Mutex<Vec<FakeTarget>>,
	/// session id -> target id
	sessions: Mutex<HashMap<String, String>>,
	commands: Mutex<Vec<RecordedCommand>>,
	created_targets: Mutex<Vec<String>>,
	next_session: AtomicU64,
	next_target: AtomicU64,
	/// Attach events for the next N created targets are swallowed,
	/// simulating a target dying before its attach event arrives.
	suppress_created_attaches: AtomicUsize,
	suppressed_targets: Mutex<Vec<String>>,
	fail_auto_attach: AtomicUsize,
	fail_get_targets: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockBrowser {
	inner: Arc<Inner>,
}

impl MockBrowser {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a target without firing any event (pre-existing target for
	/// startup discovery).
	pub fn add_target(&self, target_id: &str, kind: &str, url: &str) {
		self.inner.targets.lock().push(FakeTarget {
			target_id: target_id.to_string(),
			kind: kind.to_string(),
			url: url.to_string(),
		});
	}

	/// Adds a target and fires its attach event, as the browser does
	/// for targets opened while auto-attach is active.
	pub fn open_target(&self, target_id: &str, kind: &str, url: &str) -> String {
		self.add_target(target_id, kind, url);
		self.fire_attach(target_id)
	}

	/// Fires an attach event for an already-listed target, returning
	/// the new session id.
	pub fn fire_attach(&self, target_id: &str) -> String {
		let session_id = self.new_session(target_id);
		self.fire_attach_with_session(target_id, &session_id, false);
		session_id
	}

	/// Fires an attach event reusing a specific session id.
	pub fn fire_attach_with_session(
		&self,
		target_id: &str,
		session_id: &str,
		waiting_for_debugger: bool,
	) {
		self.inner
			.sessions
			.lock()
			.insert(session_id.to_string(), target_id.to_string());
		let (kind, url) = {
			let targets = self.inner.targets.lock();
			let target = targets
				.iter()
				.find(|t| t.target_id == target_id)
				.expect("attach event for unknown target");
			(target.kind.clone(), target.url.clone())
		};
		self.emit(
			methods::ATTACHED_TO_TARGET,
			None,
			json!({
				"sessionId": session_id,
				"targetInfo": {
					"targetId": target_id,
					"type": kind,
					"title": "",
					"url": url,
				},
				"waitingForDebugger": waiting_for_debugger,
			}),
		);
	}

	/// Fires a detach event for one session.
	pub fn fire_detach(&self, session_id: &str, with_target_id: bool) {
		let target_id = self.inner.sessions.lock().remove(session_id);
		let mut params = json!({ "sessionId": session_id });
		if with_target_id {
			if let Some(target_id) = &target_id {
				params["targetId"] = json!(target_id);
			}
		}
		self.emit(methods::DETACHED_FROM_TARGET, None, params);
	}

	/// Fires an arbitrary event payload, bypassing mock bookkeeping.
	pub fn fire_raw_event(&self, method: &str, params: Value) {
		self.emit(method, None, params);
	}

	/// Fires a detach event verbatim, regardless of mock bookkeeping.
	pub fn fire_detach_raw(&self, session_id: &str, target_id: &str) {
		self.emit(
			methods::DETACHED_FROM_TARGET,
			None,
			json!({ "sessionId": session_id, "targetId": target_id }),
		);
	}

	/// Removes a target and fires detach events for all its sessions,
	/// as the browser does when a tab closes.
	pub fn close_target(&self, target_id: &str) {
		self.inner.targets.lock().retain(|t| t.target_id != target_id);
		let sessions: Vec<String> = {
			let sessions = self.inner.sessions.lock();
			sessions
				.iter()
				.filter(|(_, t)| t.as_str() == target_id)
				.map(|(s, _)| s.clone())
				.collect()
		};
		for session_id in sessions {
			self.inner.sessions.lock().remove(&session_id);
			self.emit(
				methods::DETACHED_FROM_TARGET,
				None,
				json!({ "sessionId": session_id, "targetId": target_id }),
			);
		}
	}

	pub fn fire_lifecycle(&self, session_id: &str, name: &str) {
		self.emit(
			methods::LIFECYCLE_EVENT,
			Some(session_id),
			json!({ "name": name, "loaderId": "L1", "timestamp": 1.0 }),
		);
	}

	pub fn fire_frame_navigated(&self, session_id: &str, url: &str, parent_id: Option<&str>) {
		let mut frame = json!({ "id": "F1", "url": url });
		if let Some(parent) = parent_id {
			frame["parentId"] = json!(parent);
		}
		self.emit(
			methods::FRAME_NAVIGATED,
			Some(session_id),
			json!({ "frame": frame }),
		);
	}

	/// Swallow the attach events of the next `n` created targets.
	pub fn suppress_next_created_attaches(&self, n: usize) {
		self.inner.suppress_created_attaches.store(n, Ordering::SeqCst);
	}

	/// Make the next `n` Target.setAutoAttach commands fail with a
	/// non-session-gone error.
	pub fn fail_next_auto_attaches(&self, n: usize) {
		self.inner.fail_auto_attach.store(n, Ordering::SeqCst);
	}

	/// Make the next `n` Target.getTargets commands fail.
	pub fn fail_next_get_targets(&self, n: usize) {
		self.inner.fail_get_targets.store(n, Ordering::SeqCst);
	}

	/// Swallow attach events for a specific target: attachToTarget still
	/// answers with a session id, but no attach event ever arrives.
	pub fn suppress_attaches_for(&self, target_id: &str) {
		self.inner
			.suppressed_targets
			.lock()
			.push(target_id.to_string());
	}

	/// Target ids allocated by Target.createTarget, in order.
	pub fn created_targets(&self) -> Vec<String> {
		self.inner.created_targets.lock().clone()
	}

	pub fn command_count(&self, method: &str) -> usize {
		self.inner
			.commands
			.lock()
			.iter()
			.filter(|c| c.method == method)
			.count()
	}

	pub fn commands_named(&self, method: &str) -> Vec<RecordedCommand> {
		self.inner
			.commands
			.lock()
			.iter()
			.filter(|c| c.method == method)
			.cloned()
			.collect()
	}

	fn new_session(&self, target_id: &str) -> String {
		let n = self.inner.next_session.fetch_add(1, Ordering::SeqCst);
		let session_id = format!("SESSION-{n}");
		self.inner
			.sessions
			.lock()
			.insert(session_id.clone(), target_id.to_string());
		session_id
	}

	fn emit(&self, method: &str, session_id: Option<&str>, params: Value) {
		let callbacks: Vec<EventCallback> = self
			.inner
			.handlers
			.lock()
			.get(method)
			.map(|v| v.to_vec())
			.unwrap_or_default();
		for callback in callbacks {
			callback(CdpEvent {
				method: method.to_string(),
				session_id: session_id.map(SessionId::from),
				params: params.clone(),
			});
		}
	}

	fn handle_command(
		&self,
		method: &str,
		session_id: Option<String>,
		params: &Value,
	) -> Result<Value, Error> {
		match method {
			methods::GET_TARGETS => {
				let failures = self.inner.fail_get_targets.load(Ordering::SeqCst);
				if failures > 0 {
					self.inner
						.fail_get_targets
						.store(failures - 1, Ordering::SeqCst);
					return Err(Error::Cdp {
						code: -32000,
						message: "Not allowed".to_string(),
					});
				}
				let targets = self.inner.targets.lock();
				let infos: Vec<Value> = targets
					.iter()
					.map(|t| {
						json!({
							"targetId": t.target_id,
							"type": t.kind,
							"title": "",
							"url": t.url,
							"attached": false,
						})
					})
					.collect();
				Ok(json!({ "targetInfos": infos }))
			}
			methods::ATTACH_TO_TARGET => {
				let target_id = params["targetId"].as_str().unwrap_or_default().to_string();
				let known = self
					.inner
					.targets
					.lock()
					.iter()
					.any(|t| t.target_id == target_id);
				if !known {
					return Err(Error::Cdp {
						code: -32000,
						message: "No target with given id found".to_string(),
					});
				}
				let session_id = self.new_session(&target_id);
				let suppressed = self
					.inner
					.suppressed_targets
					.lock()
					.contains(&target_id);
				if !suppressed {
					self.fire_attach_with_session(&target_id, &session_id, false);
				}
				Ok(json!({ "sessionId": session_id }))
			}
			methods::CREATE_TARGET => {
				let url = params["url"].as_str().unwrap_or("about:blank").to_string();
				let n = self.inner.next_target.fetch_add(1, Ordering::SeqCst);
				let target_id = format!("CREATED-{n}");
				self.add_target(&target_id, "page", &url);
				self.inner.created_targets.lock().push(target_id.clone());

				let remaining = self.inner.suppress_created_attaches.load(Ordering::SeqCst);
				if remaining > 0 {
					self.inner
						.suppress_created_attaches
						.store(remaining - 1, Ordering::SeqCst);
					self.inner.suppressed_targets.lock().push(target_id.clone());
				} else {
					self.fire_attach(&target_id);
				}
				Ok(json!({ "targetId": target_id }))
			}
			methods::ACTIVATE_TARGET => Ok(json!({})),
			methods::SET_AUTO_ATTACH => {
				let failures = self.inner.fail_auto_attach.load(Ordering::SeqCst);
				if failures > 0 {
					self.inner
						.fail_auto_attach
						.store(failures - 1, Ordering::SeqCst);
					return Err(Error::Cdp {
						code: -32000,
						message: "Internal error".to_string(),
					});
				}
				let session_id = session_id.unwrap_or_default();
				if !self.inner.sessions.lock().contains_key(&session_id) {
					return Err(Error::Cdp {
						code: -32001,
						message: "Session with given id not found".to_string(),
					});
				}
				Ok(json!({}))
			}
			methods::RUN_IF_WAITING_FOR_DEBUGGER
			| methods::SET_LIFECYCLE_EVENTS_ENABLED
			| methods::NETWORK_ENABLE => Ok(json!({})),
			other => Err(Error::Cdp {
				code: -32601,
				message: format!("'{other}' wasn't found"),
			}),
		}
	}
}

impl CdpClient for MockBrowser {
	fn send(
		&self,
		method: &str,
		session_id: Option<&SessionId>,
		params: Value,
	) -> CommandFuture<'_> {
		let method = method.to_string();
		let session_id = session_id.map(|s| s.as_str().to_string());
		let this = self.clone();
		Box::pin(async move {
			this.inner.commands.lock().push(RecordedCommand {
				method: method.clone(),
				session_id: session_id.clone(),
				params: params.clone(),
			});
			this.handle_command(&method, session_id, &params)
		})
	}

	fn register_event_handler(&self, method: &str, handler: EventCallback) {
		self.inner
			.handlers
			.lock()
			.entry(method.to_string())
			.or_default()
			.push(handler);
	}
}

/// Short deadlines so bounded-poll failure paths stay fast in tests.
pub fn fast_config() -> MonitorConfig {
	MonitorConfig {
		discovery_timeout: Duration::from_millis(500),
		discovery_poll_interval: Duration::from_millis(10),
		recovery_timeout: Duration::from_millis(300),
		recovery_poll_interval: Duration::from_millis(10),
	}
}

pub fn new_manager(mock: &MockBrowser) -> Arc<SessionManager> {
	init_logging();
	Arc::new(SessionManager::new(
		Arc::new(mock.clone()),
		AgentFocus::new(),
		EventBus::default(),
		fast_config(),
	))
}

/// Polls an async condition until it holds or the timeout expires.
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
	F: AsyncFnMut() -> bool,
{
	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		if condition().await {
			return true;
		}
		if tokio::time::Instant::now() >= deadline {
			return false;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
}

pub fn init_logging() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
		)
		.with_test_writer()
		.try_init();
}
