//! Process shutdown signals.

use std::future::Future;

use anyhow::{Context, Result};

/// Installs the shutdown handlers and returns a future that resolves with the
/// name of the first signal received.
///
/// Handlers are installed eagerly so a signal arriving before the future is
/// first polled is not lost.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
	let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

	Ok(async move {
		tokio::select! {
			_ = sigterm.recv() => "SIGTERM",
			_ = sigint.recv() => "SIGINT",
		}
	})
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
	Ok(async {
		match tokio::signal::ctrl_c().await {
			Ok(()) => "Ctrl+C",
			// Without a handler only the console can end the run.
			Err(_) => std::future::pending().await,
		}
	})
}
