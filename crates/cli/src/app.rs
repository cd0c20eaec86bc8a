//! Wires configuration, the supervisor and the console together.

use std::sync::Arc;

use afk::{BotConfig, ConnectionSupervisor};
use afk_runtime::DriverConnector;
use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;

use crate::console::{CommandRouter, Exit};
use crate::signal::shutdown_signal;

/// Runs the bot until the operator quits, input ends, or a signal arrives.
///
/// Every session is stopped and its driver released before returning.
pub async fn run(config: BotConfig) -> Result<()> {
	let shutdown = shutdown_signal()?;
	let mut supervisor = ConnectionSupervisor::start(&config, Arc::new(DriverConnector::new()));

	let mut router = CommandRouter::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
	let outcome = router.run(&supervisor, shutdown).await;

	match &outcome {
		Ok(Exit::Quit) => info!(target = "afk", "quit requested from console"),
		Ok(Exit::EndOfInput) => info!(target = "afk", "console input closed"),
		Ok(Exit::Interrupted) => {}
		Err(e) => info!(target = "afk", error = %e, "console failed"),
	}

	supervisor.stop_all().await;
	outcome.map(|_| ())
}
