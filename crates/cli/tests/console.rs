//! Console routing against the mock connector.

use std::time::Duration;

use afk::testing::MockConnector;
use afk::{BotConfig, ConnectionSupervisor, Edition, LifecycleState, SessionConfig};
use afk_cli::console::{CommandRouter, Exit};
use afk_protocol::DriverEvent;

fn both_enabled() -> BotConfig {
	BotConfig {
		java: Some(SessionConfig::defaults(Edition::Java)),
		bedrock: Some(SessionConfig::defaults(Edition::Bedrock)),
		settle_delay: Duration::from_secs(10),
	}
}

async fn wait_connected(supervisor: &ConnectionSupervisor, edition: Edition) {
	let mut rx = supervisor.session(edition).expect("session exists").subscribe();
	tokio::time::timeout(Duration::from_secs(3600), rx.wait_for(|s| *s == LifecycleState::Connected))
		.await
		.unwrap_or_else(|_| panic!("{edition} never connected"))
		.unwrap();
}

async fn run_console(supervisor: &ConnectionSupervisor, input: &[u8]) -> (Exit, String) {
	let mut output = Vec::new();
	let exit = CommandRouter::new(input, &mut output)
		.run(supervisor, std::future::pending())
		.await
		.unwrap();
	(exit, String::from_utf8(output).unwrap())
}

#[tokio::test(start_paused = true)]
async fn lines_are_routed_to_the_right_edition() {
	let connector = MockConnector::new();
	connector.on_connect(Edition::Java, vec![DriverEvent::Login(Default::default())]);
	connector.on_connect(Edition::Bedrock, vec![DriverEvent::Spawn(Default::default())]);
	let mut supervisor = ConnectionSupervisor::start(&both_enabled(), connector.clone());
	wait_connected(&supervisor, Edition::Java).await;
	wait_connected(&supervisor, Edition::Bedrock).await;

	let (exit, output) = run_console(&supervisor, b"hello\n/bedrock hi\n\n/java\n/quit\n").await;

	assert_eq!(exit, Exit::Quit);
	assert_eq!(connector.chats(Edition::Java), vec!["hello"]);
	assert_eq!(connector.chats(Edition::Bedrock), vec!["hi"]);
	assert!(output.contains("Chat input enabled"));
	assert!(output.contains("Sending: hello"));
	assert!(output.contains("Sending: hi"));
	assert!(output.contains("Usage: /java <message>"));
	supervisor.stop_all().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_edition_is_reported() {
	let connector = MockConnector::new();
	connector.on_connect(Edition::Java, vec![DriverEvent::Login(Default::default())]);
	let config = BotConfig {
		bedrock: None,
		..both_enabled()
	};
	let mut supervisor = ConnectionSupervisor::start(&config, connector.clone());
	wait_connected(&supervisor, Edition::Java).await;

	let (exit, output) = run_console(&supervisor, b"/datagram hi\n").await;

	assert_eq!(exit, Exit::EndOfInput);
	assert!(output.contains("Client is not connected or disabled"));
	assert!(connector.chats(Edition::Java).is_empty());
	supervisor.stop_all().await;
}

#[tokio::test(start_paused = true)]
async fn no_sessions_at_all() {
	let connector = MockConnector::new();
	let config = BotConfig {
		java: None,
		bedrock: None,
		settle_delay: Duration::from_secs(10),
	};
	let mut supervisor = ConnectionSupervisor::start(&config, connector.clone());

	let (exit, output) = run_console(&supervisor, b"hello\n/quit\n").await;

	assert_eq!(exit, Exit::Quit);
	assert!(output.contains("No clients are connected"));
	supervisor.stop_all().await;
}

#[tokio::test(start_paused = true)]
async fn clear_reprints_help() {
	let supervisor = ConnectionSupervisor::default();

	let (_, output) = run_console(&supervisor, b"/clear\n/quit\n").await;

	assert!(output.contains("\x1B[2J\x1B[1;1H"));
	assert!(output.contains("Console cleared. Chat input enabled."));
	assert_eq!(output.matches(r#"Use "/quit" to disconnect and exit"#).count(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_console() {
	let supervisor = ConnectionSupervisor::default();
	// The peer stays open, so only the shutdown future can end the loop.
	let (reader, _peer) = tokio::io::duplex(64);
	let mut output = Vec::new();

	let exit = CommandRouter::new(tokio::io::BufReader::new(reader), &mut output)
		.run(&supervisor, async { "SIGTERM" })
		.await
		.unwrap();

	assert_eq!(exit, Exit::Interrupted);
}
