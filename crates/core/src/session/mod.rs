//! Protocol sessions.
//!
//! A [`ProtocolSession`] owns one edition's connection for the lifetime of the
//! bot: it connects, waits for the handshake, keeps the connection alive,
//! classifies whatever ends it, and reconnects after a flat delay. Each session
//! runs as its own task and owns its link and timers outright; the outside
//! world talks to it through a [`SessionHandle`].

mod handle;
mod state;

use std::future::pending;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use afk_protocol::{DriverError, DriverEvent, Edition, ReasonSummary};
use afk_runtime::{ConnectRequest, Connector, Handle, Link};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep, sleep_until};
use tracing::{debug, error, info, warn};

pub use handle::{SessionCommand, SessionHandle};
pub use state::{LifecycleState, StartGate};

use crate::config::SessionConfig;
use crate::error::SendError;
use crate::failure::Failure;
use crate::profile::{EditionProfile, KEEPALIVE_PACKET};

/// How a connection attempt came to an end.
enum Attempt {
	Failed(Failure),
	Stopped,
}

/// One edition's long-lived connect/maintain loop.
pub struct ProtocolSession {
	config: SessionConfig,
	profile: &'static EditionProfile,
	connector: Arc<dyn Connector>,
	gate: StartGate,
	commands: mpsc::UnboundedReceiver<SessionCommand>,
	state: watch::Sender<LifecycleState>,
	logins: watch::Sender<u64>,
	/// Name the server knows the bot by on the current connection.
	identity: String,
	remediated: bool,
}

impl ProtocolSession {
	/// Starts a session task and returns its handle.
	///
	/// Must be called from within a tokio runtime.
	pub fn spawn(config: SessionConfig, connector: Arc<dyn Connector>, gate: StartGate) -> SessionHandle {
		let edition = config.edition;
		let (command_tx, commands) = mpsc::unbounded_channel();
		let (state, state_rx) = watch::channel(LifecycleState::Idle);
		let (logins, logins_rx) = watch::channel(0);

		let session = Self {
			profile: EditionProfile::for_edition(edition),
			identity: config.username.clone(),
			config,
			connector,
			gate,
			commands,
			state,
			logins,
			remediated: false,
		};
		let task = tokio::spawn(session.run());

		SessionHandle::new(edition, command_tx, state_rx, logins_rx, task)
	}

	fn edition(&self) -> Edition {
		self.config.edition
	}

	fn tag(&self) -> &'static str {
		self.config.edition.tag()
	}

	async fn run(mut self) {
		if self.wait_for_gate().await {
			loop {
				let failure = match self.attempt().await {
					Attempt::Failed(failure) => failure,
					Attempt::Stopped => break,
				};

				self.report(&failure);
				self.remediate(&failure);

				self.set_state(LifecycleState::Backoff);
				let delay = self.config.retry_delay;
				info!(
					target = "afk",
					edition = %self.edition(),
					delay_secs = delay.as_secs(),
					"{} Attempting to reconnect in {} seconds...",
					self.tag(),
					delay.as_secs()
				);
				if !self.sleep_or_stop(delay).await {
					break;
				}
			}
		}

		self.set_state(LifecycleState::Shutdown);
		debug!(target = "afk", edition = %self.edition(), "session stopped");
	}

	fn set_state(&self, next: LifecycleState) {
		let previous = self.state.send_replace(next);
		if previous != next {
			debug!(target = "afk", edition = %self.edition(), from = %previous, to = %next, "lifecycle transition");
		}
	}

	/// Answers a command received while no link is held.
	///
	/// Returns `false` when the session should stop.
	fn idle_command(command: Option<SessionCommand>) -> bool {
		match command {
			Some(SessionCommand::Chat { reply, .. }) => {
				let _ = reply.send(Err(SendError::NotConnected));
				true
			}
			Some(SessionCommand::Stop) | None => false,
		}
	}

	/// Sleeps for `delay` unless stopped first. Returns `false` when stopped.
	async fn sleep_or_stop(&mut self, delay: Duration) -> bool {
		let timer = sleep(delay);
		tokio::pin!(timer);
		loop {
			tokio::select! {
				_ = &mut timer => return true,
				command = self.commands.recv() => {
					if !Self::idle_command(command) {
						return false;
					}
				}
			}
		}
	}

	/// Holds the first attempt until the start gate opens. Returns `false` when
	/// stopped while waiting.
	async fn wait_for_gate(&mut self) -> bool {
		let StartGate::AfterConnected { mut leader, settle } = std::mem::replace(&mut self.gate, StartGate::Open) else {
			return true;
		};

		let tag = self.tag();
		info!(target = "afk", edition = %self.edition(), "{tag} Waiting for the Java session to log in first");

		loop {
			tokio::select! {
				ready = async { leader.wait_for(|logins| *logins > 0).await.is_ok() } => {
					if !ready {
						debug!(target = "afk", edition = %self.edition(), "leader session gone, opening gate");
					}
					break;
				}
				command = self.commands.recv() => {
					if !Self::idle_command(command) {
						return false;
					}
				}
			}
		}

		info!(
			target = "afk",
			edition = %self.edition(),
			settle_secs = settle.as_secs(),
			"{tag} Waiting {} seconds before connecting to avoid authentication conflicts...",
			settle.as_secs()
		);
		self.sleep_or_stop(settle).await
	}

	/// Runs one connection attempt from Connecting until the link is released.
	async fn attempt(&mut self) -> Attempt {
		self.identity.clone_from(&self.config.username);
		self.set_state(LifecycleState::Connecting);
		info!(
			target = "afk",
			edition = %self.edition(),
			config = %self.config.summary(),
			"{} Attempting to connect to {}",
			self.tag(),
			self.config.address()
		);

		let request = ConnectRequest {
			edition: self.edition(),
			params: self.config.connect_params(),
			driver: self.config.driver.clone(),
		};

		let deadline = self.config.connect_timeout.map(|timeout| Instant::now() + timeout);
		let watchdog = expire_at(deadline);
		tokio::pin!(watchdog);

		let connector = Arc::clone(&self.connector);
		let connect = connector.connect(&request);
		tokio::pin!(connect);

		let handle = loop {
			tokio::select! {
				result = &mut connect => match result {
					Ok(handle) => break handle,
					Err(e) => {
						self.set_state(LifecycleState::Disconnected);
						return Attempt::Failed(Failure::from_runtime(self.edition(), &e));
					}
				},
				command = self.commands.recv() => {
					if !Self::idle_command(command) {
						return Attempt::Stopped;
					}
				}
				_ = &mut watchdog => {
					self.set_state(LifecycleState::Disconnected);
					return Attempt::Failed(self.watchdog_failure());
				}
			}
		};

		let Handle { mut link, mut events } = handle;
		let mut connected = false;
		let mut keepalive: Option<Interval> = None;

		let outcome = loop {
			tokio::select! {
				event = events.recv() => {
					let Some(event) = event else {
						break Attempt::Failed(Failure::Transport {
							detail: "driver connection closed".to_string(),
						});
					};
					if let Some(failure) = self.on_event(event, &mut link, &mut connected, &mut keepalive).await {
						break Attempt::Failed(failure);
					}
				}
				command = self.commands.recv() => match command {
					Some(SessionCommand::Chat { text, reply }) => {
						let result = if connected {
							link.chat(&text).await.map_err(|e| SendError::Link(e.to_string()))
						} else {
							Err(SendError::NotConnected)
						};
						let _ = reply.send(result);
					}
					Some(SessionCommand::Stop) | None => break Attempt::Stopped,
				},
				_ = &mut watchdog, if !connected => {
					break Attempt::Failed(self.watchdog_failure());
				}
				_ = tick(&mut keepalive) => {
					let params = EditionProfile::keepalive_params(unix_millis());
					if let Err(e) = link.write(KEEPALIVE_PACKET, params).await {
						debug!(target = "afk", edition = %self.edition(), error = %e, "keep-alive write failed");
					}
				}
			}
		};

		if keepalive.take().is_some() {
			debug!(target = "afk", edition = %self.edition(), "keep-alive stopped");
		}
		if let Attempt::Failed(_) = outcome {
			self.set_state(LifecycleState::Disconnected);
		}
		link.quit("Disconnecting").await;

		outcome
	}

	fn watchdog_failure(&self) -> Failure {
		let timeout = self.config.connect_timeout.unwrap_or_default();
		Failure::TransportTimeout {
			detail: format!("no handshake within {} seconds", timeout.as_secs()),
		}
	}

	/// Handles one driver event. Returns the failure that ends the connection,
	/// if the event is terminal.
	async fn on_event(
		&mut self,
		event: DriverEvent,
		link: &mut Box<dyn Link>,
		connected: &mut bool,
		keepalive: &mut Option<Interval>,
	) -> Option<Failure> {
		if self.profile.is_handshake(&event) {
			self.adopt_identity(&event);
			if *connected {
				debug!(target = "afk", edition = %self.edition(), event = event.name(), "handshake event while connected");
			} else {
				*connected = true;
				*keepalive = self.on_connected();
			}
			return None;
		}

		let tag = self.tag();
		match event {
			DriverEvent::Kicked(kick) => {
				self.log_reason("Kicked from server", &ReasonSummary::from_value(&kick.reason));
				Some(Failure::from_kick(self.edition(), &kick))
			}
			DriverEvent::Disconnect(params) => {
				let reason = ReasonSummary::from_value(&params.reason.clone().unwrap_or_default());
				self.log_reason("Disconnected from server", &reason);
				Some(Failure::from_disconnect(self.edition(), &params))
			}
			DriverEvent::End(params) => Some(Failure::from_end(&params)),
			DriverEvent::Error(err) => {
				self.log_driver_error(&err);
				Some(Failure::from_driver_error(self.edition(), &err))
			}
			DriverEvent::Chat(chat) => {
				if chat.username == self.identity {
					return None;
				}
				info!(target = "afk", edition = %self.edition(), sender = %chat.username, "{tag} {}: {}", chat.username, chat.message);

				if let Some(reply) = self.profile.reply_to(&chat.username, &chat.message, &self.identity) {
					if let Err(e) = link.chat(reply).await {
						warn!(target = "afk", edition = %self.edition(), error = %e, "{tag} Failed to send auto-reply");
					}
				}
				None
			}
			DriverEvent::Text(text) => {
				let sender = text.source.as_deref().filter(|s| !s.is_empty()).unwrap_or("Server");
				if sender == self.identity {
					return None;
				}
				info!(target = "afk", edition = %self.edition(), %sender, "{tag} {sender}: {}", text.message);
				None
			}
			DriverEvent::Unknown(envelope) => {
				debug!(target = "afk", edition = %self.edition(), event = %envelope.event, "ignoring driver event");
				None
			}
			other => {
				debug!(target = "afk", edition = %self.edition(), event = other.name(), "ignoring driver event");
				None
			}
		}
	}

	/// Takes the server-assigned name from a handshake event, when it has one.
	fn adopt_identity(&mut self, event: &DriverEvent) {
		let Some(name) = event.handshake().and_then(|h| h.username.as_deref()).filter(|n| !n.is_empty()) else {
			return;
		};
		if name != self.identity {
			debug!(target = "afk", edition = %self.edition(), configured = %self.config.username, assigned = %name, "server-assigned username");
			self.identity = name.to_string();
		}
	}

	/// Transition to Connected. Returns the keep-alive ticker when this
	/// edition needs one.
	fn on_connected(&self) -> Option<Interval> {
		self.set_state(LifecycleState::Connected);
		self.logins.send_modify(|logins| *logins += 1);

		let tag = self.tag();
		let edition = self.edition();
		info!(target = "afk", %edition, "{tag} Successfully connected to {}", self.config.address());
		info!(target = "afk", %edition, "{tag} Logged in as {}", self.identity);
		info!(target = "afk", %edition, "{tag} AFK mode active - The bot will stay connected without moving");

		let period = self.config.keepalive_interval?;
		debug!(target = "afk", %edition, period_secs = period.as_secs(), "keep-alive started");
		let mut ticker = interval_at(Instant::now() + period, period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		Some(ticker)
	}

	fn log_reason(&self, heading: &str, reason: &ReasonSummary) {
		let tag = self.tag();
		let edition = self.edition();
		warn!(target = "afk", %edition, "{tag} {heading}");
		warn!(target = "afk", %edition, "{tag} Reason: {}", reason.raw);
		if let Some(message) = &reason.message {
			warn!(target = "afk", %edition, "{tag} Message: {message}");
		}
		if let Some(additional) = &reason.additional {
			warn!(target = "afk", %edition, "{tag} Additional info: {additional}");
		}
	}

	fn log_driver_error(&self, err: &DriverError) {
		let tag = self.tag();
		let edition = self.edition();
		error!(target = "afk", %edition, "{tag} Error Type: {}", err.name.as_deref().unwrap_or("Error"));
		error!(target = "afk", %edition, "{tag} Error Message: {}", err.message);
		error!(target = "afk", %edition, "{tag} Error Code: {}", err.code.as_deref().unwrap_or("N/A"));

		for (i, nested) in err.errors.iter().enumerate() {
			error!(
				target = "afk",
				%edition,
				code = nested.code.as_deref().unwrap_or("N/A"),
				address = nested.address.as_deref().unwrap_or("N/A"),
				port = ?nested.port,
				"{tag} Error {}: {}",
				i + 1,
				nested.message
			);
		}
		if let Some(stack) = &err.stack {
			debug!(target = "afk", %edition, "{tag} Full Error Stack:\n{stack}");
		}
	}

	/// Logs a classified failure with its hints.
	fn report(&self, failure: &Failure) {
		let tag = self.tag();
		let edition = self.edition();
		let address = self.config.address();

		if failure.is_routine() {
			warn!(target = "afk", %edition, %address, cause = failure.cause(), detail = %failure.detail(), "{tag} {failure}");
		} else {
			error!(
				target = "afk",
				%edition,
				%address,
				cause = failure.cause(),
				detail = %failure.detail(),
				"{tag} Connection to {address} failed: {failure}"
			);
		}
		for hint in failure.hints(&self.config) {
			warn!(target = "afk", %edition, "{tag} {hint}");
		}
	}

	/// Switches to the fallback version after the first version mismatch.
	fn remediate(&mut self, failure: &Failure) {
		if self.remediated || !failure.is_version_mismatch() {
			return;
		}
		let Some(fallback) = self.config.fallback_version.clone() else {
			return;
		};
		if fallback == self.config.version {
			return;
		}

		info!(
			target = "afk",
			edition = %self.edition(),
			from = %self.config.version,
			to = %fallback,
			"{} Retrying with fallback version {fallback}",
			self.tag()
		);
		self.config.version = fallback;
		self.remediated = true;
	}
}

/// Completes at `deadline`, or never.
async fn expire_at(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => sleep_until(deadline).await,
		None => pending().await,
	}
}

/// Next keep-alive tick, or never when there is no ticker.
async fn tick(keepalive: &mut Option<Interval>) {
	match keepalive {
		Some(ticker) => {
			ticker.tick().await;
		}
		None => pending().await,
	}
}

fn unix_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or_default()
}
