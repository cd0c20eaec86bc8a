//! Test doubles for sessions and the supervisor.
//!
//! [`MockConnector`] stands in for the driver-backed connector. Every connect
//! attempt is recorded (edition, time, parameters) and answered with a
//! [`MockLink`] whose traffic is recorded too. Tests drive the connection by
//! injecting [`DriverEvent`]s into whichever connection is current for an
//! edition.
//!
//! ```ignore
//! let connector = MockConnector::new();
//! connector.on_connect(Edition::Java, vec![DriverEvent::Login(Default::default())]);
//!
//! let handle = ProtocolSession::spawn(config, connector.clone(), StartGate::Open);
//! // ... the session connects and reaches Connected
//! connector.emit(Edition::Java, DriverEvent::End(Default::default()));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use afk_protocol::{ConnectParams, DriverEvent, Edition};
use afk_runtime::{ConnectRequest, Connector, Handle, Link};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// One recorded call to [`Connector::connect`].
#[derive(Debug, Clone)]
pub struct ConnectAttempt {
	pub edition: Edition,
	pub at: Instant,
	pub params: ConnectParams,
	pub driver: Option<String>,
}

#[derive(Default)]
struct EditionState {
	/// Event sender of the current connection.
	events: Option<mpsc::UnboundedSender<DriverEvent>>,
	/// Events emitted on every successful connect.
	on_connect: Vec<DriverEvent>,
	/// Errors returned by upcoming connect calls, in order.
	failures: VecDeque<afk_runtime::Error>,
	fail_always: bool,
	/// Link calls fail (after being recorded) while set.
	fail_chats: bool,
	fail_writes: bool,
	chats: Vec<String>,
	writes: Vec<(String, Value)>,
	quits: Vec<String>,
	links_open: usize,
}

#[derive(Default)]
struct Shared {
	attempts: Vec<ConnectAttempt>,
	editions: HashMap<Edition, EditionState>,
}

/// Recording [`Connector`].
#[derive(Default)]
pub struct MockConnector {
	shared: Arc<Mutex<Shared>>,
}

impl MockConnector {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Events to emit as soon as each connection for `edition` opens.
	pub fn on_connect(&self, edition: Edition, events: Vec<DriverEvent>) {
		self.shared.lock().editions.entry(edition).or_default().on_connect = events;
	}

	/// Makes the next connect for `edition` fail with `error`.
	pub fn fail_next(&self, edition: Edition, error: afk_runtime::Error) {
		self.shared.lock().editions.entry(edition).or_default().failures.push_back(error);
	}

	/// Makes every connect for `edition` fail with a refused connection.
	pub fn fail_always(&self, edition: Edition) {
		self.shared.lock().editions.entry(edition).or_default().fail_always = true;
	}

	/// Makes every chat sent through `edition`'s links fail.
	pub fn fail_chats(&self, edition: Edition) {
		self.shared.lock().editions.entry(edition).or_default().fail_chats = true;
	}

	/// Makes every raw write sent through `edition`'s links fail.
	pub fn fail_writes(&self, edition: Edition) {
		self.shared.lock().editions.entry(edition).or_default().fail_writes = true;
	}

	/// Injects an event into the current connection for `edition`.
	///
	/// Returns `false` if there is no open connection.
	pub fn emit(&self, edition: Edition, event: DriverEvent) -> bool {
		let shared = self.shared.lock();
		shared
			.editions
			.get(&edition)
			.and_then(|state| state.events.as_ref())
			.is_some_and(|tx| tx.send(event).is_ok())
	}

	/// Closes the current connection's event stream, as a crashed driver would.
	pub fn drop_connection(&self, edition: Edition) {
		if let Some(state) = self.shared.lock().editions.get_mut(&edition) {
			state.events = None;
		}
	}

	pub fn attempts(&self) -> Vec<ConnectAttempt> {
		self.shared.lock().attempts.clone()
	}

	pub fn attempts_for(&self, edition: Edition) -> Vec<ConnectAttempt> {
		self.shared
			.lock()
			.attempts
			.iter()
			.filter(|a| a.edition == edition)
			.cloned()
			.collect()
	}

	/// Chat lines sent through `edition`'s links.
	pub fn chats(&self, edition: Edition) -> Vec<String> {
		self.with_edition(edition, |state| state.chats.clone())
	}

	/// Raw packet writes sent through `edition`'s links.
	pub fn writes(&self, edition: Edition) -> Vec<(String, Value)> {
		self.with_edition(edition, |state| state.writes.clone())
	}

	/// Quit reasons received by `edition`'s links.
	pub fn quits(&self, edition: Edition) -> Vec<String> {
		self.with_edition(edition, |state| state.quits.clone())
	}

	/// Links handed out for `edition` and not yet quit.
	pub fn open_links(&self, edition: Edition) -> usize {
		self.with_edition(edition, |state| state.links_open)
	}

	fn with_edition<T: Default>(&self, edition: Edition, f: impl FnOnce(&EditionState) -> T) -> T {
		self.shared.lock().editions.get(&edition).map(f).unwrap_or_default()
	}
}

#[async_trait]
impl Connector for MockConnector {
	async fn connect(&self, request: &ConnectRequest) -> afk_runtime::Result<Handle> {
		let mut shared = self.shared.lock();
		shared.attempts.push(ConnectAttempt {
			edition: request.edition,
			at: Instant::now(),
			params: request.params.clone(),
			driver: request.driver.clone(),
		});

		let state = shared.editions.entry(request.edition).or_default();
		if let Some(error) = state.failures.pop_front() {
			return Err(error);
		}
		if state.fail_always {
			return Err(afk_runtime::Error::Io(std::io::Error::new(
				std::io::ErrorKind::ConnectionRefused,
				"connection refused",
			)));
		}

		let (tx, events) = mpsc::unbounded_channel();
		for event in &state.on_connect {
			let _ = tx.send(event.clone());
		}
		state.events = Some(tx);
		state.links_open += 1;

		Ok(Handle {
			link: Box::new(MockLink {
				edition: request.edition,
				shared: Arc::clone(&self.shared),
			}),
			events,
		})
	}
}

/// Recording [`Link`] handed out by [`MockConnector`].
pub struct MockLink {
	edition: Edition,
	shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl Link for MockLink {
	async fn chat(&mut self, message: &str) -> afk_runtime::Result<()> {
		let mut shared = self.shared.lock();
		let state = shared.editions.entry(self.edition).or_default();
		state.chats.push(message.to_string());
		if state.fail_chats {
			return Err(link_failure("chat"));
		}
		Ok(())
	}

	async fn write(&mut self, name: &str, params: Value) -> afk_runtime::Result<()> {
		let mut shared = self.shared.lock();
		let state = shared.editions.entry(self.edition).or_default();
		state.writes.push((name.to_string(), params));
		if state.fail_writes {
			return Err(link_failure("write"));
		}
		Ok(())
	}

	async fn quit(self: Box<Self>, reason: &str) {
		let mut shared = self.shared.lock();
		let state = shared.editions.entry(self.edition).or_default();
		state.quits.push(reason.to_string());
		state.events = None;
		state.links_open = state.links_open.saturating_sub(1);
	}
}

fn link_failure(what: &str) -> afk_runtime::Error {
	afk_runtime::Error::TransportError(format!("injected {what} failure"))
}
