//! Timing configuration for the lifecycle manager.

use std::time::Duration;

/// Deadlines and poll intervals for the manager's bounded waits.
///
/// Every wait in the manager is a fixed-interval poll against a
/// monotonic deadline; these are the constants. Tests shrink them.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
	/// How long startup discovery waits for attached targets to appear
	/// in the pool before logging a shortfall and proceeding.
	pub discovery_timeout: Duration,
	/// Poll interval during startup discovery.
	pub discovery_poll_interval: Duration,
	/// How long recovery waits for a session to materialize for the
	/// chosen replacement target, per fallback tier.
	pub recovery_timeout: Duration,
	/// Poll interval during recovery.
	pub recovery_poll_interval: Duration,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			discovery_timeout: Duration::from_secs(2),
			discovery_poll_interval: Duration::from_millis(50),
			recovery_timeout: Duration::from_secs(2),
			recovery_poll_interval: Duration::from_millis(100),
		}
	}
}
