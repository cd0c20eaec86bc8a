//! Connection seam between sessions and drivers.
//!
//! Sessions are written against two traits:
//!
//! - [`Connector`] opens a connection for a [`ConnectRequest`] and returns a
//!   [`Handle`]: the [`Link`] used to act on the connection, plus the
//!   [`EventStream`] of decoded [`DriverEvent`]s.
//! - [`Link`] sends chat and raw protocol writes, and tears the connection
//!   down with [`Link::quit`].
//!
//! [`DriverConnector`] is the production implementation. It resolves the
//! edition's driver, brings up a transport to it, and sends the `connect`
//! command. The event stream closes when the driver goes away; a transport
//! failure is reported as a final [`DriverEvent::Error`] before that.

use afk_protocol::{ConnectParams, DriverCommand, DriverError, DriverEvent, Edition, Envelope};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::driver::{DriverEndpoint, locate_driver};
use crate::error::{Error, Result};
use crate::process::DriverProcess;
use crate::transport::{PipeTransport, Transport, TransportParts, WebSocketTransport};

/// Decoded events from one connection, in arrival order.
pub type EventStream = mpsc::UnboundedReceiver<DriverEvent>;

/// Outbound side of an open connection.
#[async_trait]
pub trait Link: Send {
	/// Sends a chat line as the bot.
	async fn chat(&mut self, message: &str) -> Result<()>;

	/// Writes a raw protocol packet.
	async fn write(&mut self, name: &str, params: Value) -> Result<()>;

	/// Leaves the server and releases every resource held by the connection.
	///
	/// Never fails; problems during teardown are logged.
	async fn quit(self: Box<Self>, reason: &str);
}

/// An open connection.
pub struct Handle {
	pub link: Box<dyn Link>,
	pub events: EventStream,
}

impl std::fmt::Debug for Handle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Handle").finish_non_exhaustive()
	}
}

/// Everything needed to open one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
	pub edition: Edition,
	pub params: ConnectParams,
	/// Explicit driver endpoint; discovered when `None`.
	pub driver: Option<String>,
}

/// Opens connections.
#[async_trait]
pub trait Connector: Send + Sync {
	async fn connect(&self, request: &ConnectRequest) -> Result<Handle>;
}

/// [`Connector`] that talks to out-of-process drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnector;

impl DriverConnector {
	pub fn new() -> Self {
		Self
	}

	/// Opens a connection through an already resolved endpoint.
	pub async fn open(&self, edition: Edition, endpoint: &DriverEndpoint, params: &ConnectParams) -> Result<Handle> {
		tracing::debug!(target = "afk", edition = %edition, driver = %endpoint.describe(), "opening driver");

		let (parts, process) = match endpoint {
			DriverEndpoint::Command { program, args } => {
				let mut process = DriverProcess::launch(edition, program, args).await?;
				let (stdin, stdout) = process.take_stdio()?;
				let (transport, message_rx) = PipeTransport::new(stdin, stdout);
				(transport.into_transport_parts(message_rx), Some(process))
			}
			DriverEndpoint::WebSocket(url) => (WebSocketTransport::connect(url).await?, None),
		};

		let (mut link, events) = DriverLink::new(edition, parts, process);
		if let Err(e) = link.send(&DriverCommand::Connect(params.clone())).await {
			Box::new(link).quit("connect failed").await;
			return Err(e);
		}

		Ok(Handle {
			link: Box::new(link),
			events,
		})
	}
}

#[async_trait]
impl Connector for DriverConnector {
	async fn connect(&self, request: &ConnectRequest) -> Result<Handle> {
		// Discovery may run `node --version`; keep it off the async workers.
		let (edition, driver) = (request.edition, request.driver.clone());
		let endpoint = tokio::task::spawn_blocking(move || locate_driver(edition, driver.as_deref()))
			.await
			.map_err(|e| Error::LaunchFailed(format!("Driver discovery aborted: {e}")))??;
		self.open(request.edition, &endpoint, &request.params).await
	}
}

/// [`Link`] over a driver transport.
pub struct DriverLink {
	edition: Edition,
	sender: Box<dyn Transport>,
	pump: JoinHandle<()>,
	process: Option<DriverProcess>,
}

impl DriverLink {
	/// Wraps transport halves, starting the task that decodes inbound frames.
	///
	/// `process` is reaped on [`Link::quit`] when the transport runs over a
	/// child's stdio.
	pub fn new(edition: Edition, parts: TransportParts, process: Option<DriverProcess>) -> (Self, EventStream) {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;
		let (event_tx, event_rx) = mpsc::unbounded_channel();

		let pump = tokio::spawn(pump_events(edition, receiver.run(), message_rx, event_tx));

		(
			Self {
				edition,
				sender,
				pump,
				process,
			},
			event_rx,
		)
	}

	async fn send(&mut self, command: &DriverCommand) -> Result<()> {
		let message = serde_json::to_value(command)?;
		self.sender.send(message).await
	}
}

#[async_trait]
impl Link for DriverLink {
	async fn chat(&mut self, message: &str) -> Result<()> {
		self.send(&DriverCommand::Chat {
			message: message.to_string(),
		})
		.await
	}

	async fn write(&mut self, name: &str, params: Value) -> Result<()> {
		self.send(&DriverCommand::Write {
			name: name.to_string(),
			params,
		})
		.await
	}

	async fn quit(mut self: Box<Self>, reason: &str) {
		let quit = DriverCommand::Quit {
			reason: reason.to_string(),
		};
		if let Err(e) = self.send(&quit).await {
			tracing::debug!(target = "afk", edition = %self.edition, error = %e, "quit not delivered");
		}
		if let Err(e) = self.sender.close().await {
			tracing::debug!(target = "afk", edition = %self.edition, error = %e, "transport close failed");
		}
		if let Some(process) = self.process.take() {
			if let Err(e) = process.shutdown().await {
				tracing::warn!(target = "afk", edition = %self.edition, error = %e, "driver shutdown failed");
			}
		}
		self.pump.abort();
	}
}

impl Drop for DriverLink {
	fn drop(&mut self) {
		self.pump.abort();
	}
}

/// Drives the transport reader and turns raw frames into [`DriverEvent`]s.
///
/// Frames that are not event envelopes, or known events with malformed
/// payloads, are skipped. When the reader fails, a synthesized
/// [`DriverEvent::Error`] is the last event before the stream closes.
async fn pump_events<F>(
	edition: Edition,
	reader: F,
	mut message_rx: mpsc::UnboundedReceiver<Value>,
	event_tx: mpsc::UnboundedSender<DriverEvent>,
) where
	F: std::future::Future<Output = Result<()>> + Send,
{
	tokio::pin!(reader);
	let mut outcome: Option<Result<()>> = None;

	loop {
		tokio::select! {
			result = &mut reader, if outcome.is_none() => {
				outcome = Some(result);
			}
			message = message_rx.recv() => {
				let Some(value) = message else { break };
				match decode_event(value) {
					Ok(event) => {
						if event_tx.send(event).is_err() {
							return;
						}
					}
					Err(e) => {
						tracing::debug!(target = "afk", edition = %edition, error = %e, "ignoring driver frame");
					}
				}
			}
		}
	}

	if let Some(Err(e)) = outcome {
		tracing::debug!(target = "afk", edition = %edition, error = %e, "driver transport closed");
		let _ = event_tx.send(DriverEvent::Error(DriverError {
			name: Some("TransportError".to_string()),
			message: e.to_string(),
			..Default::default()
		}));
	}
}

fn decode_event(value: Value) -> std::result::Result<DriverEvent, serde_json::Error> {
	let envelope: Envelope = serde_json::from_value(value)?;
	DriverEvent::from_envelope(envelope)
}
