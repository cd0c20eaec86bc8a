//! Driver process lifecycle
//!
//! Spawns a driver command with piped stdio and reaps it on shutdown.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use afk_protocol::Edition;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::{Error, Result};

/// How long a freshly spawned driver must survive before it counts as started.
const STARTUP_PROBE: Duration = Duration::from_millis(100);

/// Grace period between closing stdin and killing the driver.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A running driver child process.
///
/// The child is killed when this value is dropped.
#[derive(Debug)]
pub struct DriverProcess {
	edition: Edition,
	child: Child,
}

impl DriverProcess {
	/// Spawns `program args...` for `edition`.
	///
	/// stdin and stdout are piped for the transport; stderr is inherited so
	/// driver diagnostics land next to ours. The child sees `AFK_EDITION`.
	///
	/// # Errors
	///
	/// Returns [`Error::LaunchFailed`] if the process cannot be spawned or
	/// exits immediately.
	pub async fn launch(edition: Edition, program: &Path, args: &[String]) -> Result<Self> {
		let mut cmd = Command::new(program);
		cmd.args(args)
			.env("AFK_EDITION", edition.name())
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);

		let mut child = cmd
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("Failed to spawn {}: {e}", program.display())))?;

		tokio::time::sleep(STARTUP_PROBE).await;

		match child.try_wait() {
			Ok(Some(status)) => {
				return Err(Error::LaunchFailed(format!(
					"{} driver exited immediately with status: {status}",
					edition
				)));
			}
			Ok(None) => {}
			Err(e) => {
				return Err(Error::LaunchFailed(format!("Failed to check driver status: {e}")));
			}
		}

		tracing::debug!(target = "afk", edition = %edition, pid = ?child.id(), "driver process started");
		Ok(Self { edition, child })
	}

	/// Edition this driver serves.
	pub fn edition(&self) -> Edition {
		self.edition
	}

	/// Takes the child's stdin and stdout for the transport.
	///
	/// # Errors
	///
	/// Returns [`Error::LaunchFailed`] if the pipes were already taken.
	pub fn take_stdio(&mut self) -> Result<(ChildStdin, ChildStdout)> {
		let stdin = self
			.child
			.stdin
			.take()
			.ok_or_else(|| Error::LaunchFailed("driver stdin unavailable".to_string()))?;
		let stdout = self
			.child
			.stdout
			.take()
			.ok_or_else(|| Error::LaunchFailed("driver stdout unavailable".to_string()))?;
		Ok((stdin, stdout))
	}

	/// Waits briefly for the driver to exit on its own, then kills it.
	///
	/// Callers close the transport first so a well-behaved driver sees EOF and
	/// leaves by itself.
	pub async fn shutdown(mut self) -> Result<()> {
		drop(self.child.stdin.take());

		match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
			Ok(Ok(status)) => {
				tracing::debug!(target = "afk", edition = %self.edition, %status, "driver exited");
				Ok(())
			}
			Ok(Err(e)) => Err(Error::LaunchFailed(format!("Failed to wait for driver: {e}"))),
			Err(_) => self.kill().await,
		}
	}

	/// Force-kills the driver.
	pub async fn kill(mut self) -> Result<()> {
		#[cfg(windows)]
		{
			drop(self.child.stdin.take());
			drop(self.child.stdout.take());
		}

		self.child
			.kill()
			.await
			.map_err(|e| Error::LaunchFailed(format!("Failed to kill driver: {e}")))?;

		let _ = tokio::time::timeout(Duration::from_millis(500), self.child.wait()).await;
		Ok(())
	}
}
