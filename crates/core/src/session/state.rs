use std::fmt;
use std::time::Duration;

use tokio::sync::watch;

/// Where a session is in its connect/maintain cycle.
///
/// ```text
/// Idle -> Connecting -> Connected -> Disconnected -> Backoff -> Connecting ...
///                   \-> Disconnected
/// any -> Shutdown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
	Idle,
	Connecting,
	Connected,
	Disconnected,
	Backoff,
	Shutdown,
}

impl LifecycleState {
	pub fn as_str(self) -> &'static str {
		match self {
			LifecycleState::Idle => "idle",
			LifecycleState::Connecting => "connecting",
			LifecycleState::Connected => "connected",
			LifecycleState::Disconnected => "disconnected",
			LifecycleState::Backoff => "backoff",
			LifecycleState::Shutdown => "shutdown",
		}
	}
}

impl fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Condition a session waits on before its first connection attempt.
#[derive(Debug)]
pub enum StartGate {
	/// Connect immediately.
	Open,
	/// Wait until another session has logged in at least once, then for
	/// `settle`.
	///
	/// `leader` is that session's login counter
	/// ([`SessionHandle::logins`](super::SessionHandle::logins)). A counter
	/// cannot be overwritten by later states, so a login followed at once by a
	/// kick still opens the gate.
	AfterConnected {
		leader: watch::Receiver<u64>,
		settle: Duration,
	},
}
