//! Transport layer between the bot and a driver.
//!
//! Two framings are supported:
//!
//! - [`PipeTransport`]: stdio pipes to a child process. Every message is a
//!   4-byte little-endian length prefix followed by that many bytes of JSON.
//! - [`WebSocketTransport`]: one JSON document per text frame.
//!
//! Both split into a sending half ([`Transport`]) and a reading half
//! ([`TransportReceiver`]) that forwards decoded JSON values into an
//! unbounded channel. The reading half's `run` returns `Ok(())` when the
//! consumer of that channel goes away, and an error when the peer closes or
//! sends garbage.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::{Error, Result};

/// Upper bound on a single pipe frame; anything larger is treated as corruption.
const MAX_FRAME_LEN: usize = 32 * 1024 * 1024;

/// Sending half of a transport.
#[async_trait]
pub trait Transport: Send {
	/// Serializes and writes one message.
	async fn send(&mut self, message: Value) -> Result<()>;

	/// Flushes and closes the outbound direction.
	async fn close(&mut self) -> Result<()> {
		Ok(())
	}
}

/// Reading half of a transport.
#[async_trait]
pub trait TransportReceiver: Send {
	/// Reads messages until the peer closes or the consumer goes away.
	async fn run(self: Box<Self>) -> Result<()>;
}

/// Both halves of a transport plus the channel its receiver feeds.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Length-prefixed JSON transport over a pair of byte streams.
pub struct PipeTransport<W, R> {
	stdin: W,
	stdout: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport writing to `stdin` and reading from `stdout`.
	///
	/// Returns the transport and the receiver decoded messages are sent to.
	pub fn new(stdin: W, stdout: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		(
			Self {
				stdin,
				stdout,
				message_tx,
			},
			message_rx,
		)
	}

	/// Splits into independently owned sending and reading halves.
	pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
		(
			PipeTransportSender { stdin: self.stdin },
			PipeTransportReceiver {
				stdout: self.stdout,
				message_tx: self.message_tx,
			},
		)
	}

	/// Splits into boxed halves bundled with the message receiver.
	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}

	/// Runs the read loop in place (without splitting).
	#[cfg(test)]
	pub(crate) async fn run(&mut self) -> Result<()> {
		read_frames(&mut self.stdout, &self.message_tx).await
	}
}

/// Sending half of a [`PipeTransport`].
pub struct PipeTransportSender<W> {
	stdin: W,
}

impl<W> PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	/// Writes one length-prefixed JSON frame.
	pub async fn send(&mut self, message: Value) -> Result<()> {
		let bytes = serde_json::to_vec(&message)?;
		let length = u32::try_from(bytes.len())
			.map_err(|_| Error::TransportError(format!("Message too large: {} bytes", bytes.len())))?;

		self.stdin
			.write_all(&length.to_le_bytes())
			.await
			.map_err(|e| Error::TransportError(format!("Failed to write length prefix: {e}")))?;
		self.stdin
			.write_all(&bytes)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to write message: {e}")))?;
		self.stdin
			.flush()
			.await
			.map_err(|e| Error::TransportError(format!("Failed to flush: {e}")))?;

		Ok(())
	}
}

#[async_trait]
impl<W> Transport for PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	async fn send(&mut self, message: Value) -> Result<()> {
		PipeTransportSender::send(self, message).await
	}

	async fn close(&mut self) -> Result<()> {
		self.stdin
			.shutdown()
			.await
			.map_err(|e| Error::TransportError(format!("Failed to close pipe: {e}")))
	}
}

/// Reading half of a [`PipeTransport`].
pub struct PipeTransportReceiver<R> {
	stdout: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

#[async_trait]
impl<R> TransportReceiver for PipeTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send,
{
	async fn run(mut self: Box<Self>) -> Result<()> {
		let this = &mut *self;
		read_frames(&mut this.stdout, &this.message_tx).await
	}
}

async fn read_frames<R>(stdout: &mut R, message_tx: &mpsc::UnboundedSender<Value>) -> Result<()>
where
	R: AsyncRead + Unpin,
{
	loop {
		let mut len_buf = [0u8; 4];
		stdout
			.read_exact(&mut len_buf)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {e}")))?;

		let length = u32::from_le_bytes(len_buf) as usize;
		if length > MAX_FRAME_LEN {
			return Err(Error::ProtocolError(format!("Frame length {length} exceeds limit")));
		}

		let mut body = vec![0u8; length];
		stdout
			.read_exact(&mut body)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read message body: {e}")))?;

		let message: Value = serde_json::from_slice(&body)?;
		if message_tx.send(message).is_err() {
			tracing::debug!("Transport consumer dropped, stopping reader");
			return Ok(());
		}
	}
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON-over-WebSocket transport for remotely hosted drivers.
pub struct WebSocketTransport;

impl WebSocketTransport {
	/// Connects to `url` and returns the split transport.
	pub async fn connect(url: &str) -> Result<TransportParts> {
		let (stream, _response) = connect_async(url).await.map_err(|e| match e {
			tokio_tungstenite::tungstenite::Error::Io(io) => Error::Io(io),
			other => Error::ConnectionFailed(format!("{url}: {other}")),
		})?;

		let (sink, stream) = stream.split();
		let (message_tx, message_rx) = mpsc::unbounded_channel();

		Ok(TransportParts {
			sender: Box::new(WebSocketTransportSender { sink }),
			receiver: Box::new(WebSocketTransportReceiver { stream, message_tx }),
			message_rx,
		})
	}
}

/// Sending half of a [`WebSocketTransport`].
pub struct WebSocketTransportSender {
	sink: SplitSink<WsStream, WsMessage>,
}

#[async_trait]
impl Transport for WebSocketTransportSender {
	async fn send(&mut self, message: Value) -> Result<()> {
		let text = serde_json::to_string(&message)?;
		self.sink
			.send(WsMessage::Text(text))
			.await
			.map_err(|e| Error::TransportError(format!("WebSocket send failed: {e}")))
	}

	async fn close(&mut self) -> Result<()> {
		self.sink
			.close()
			.await
			.map_err(|e| Error::TransportError(format!("WebSocket close failed: {e}")))
	}
}

/// Reading half of a [`WebSocketTransport`].
pub struct WebSocketTransportReceiver {
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<Value>,
}

#[async_trait]
impl TransportReceiver for WebSocketTransportReceiver {
	async fn run(mut self: Box<Self>) -> Result<()> {
		while let Some(frame) = self.stream.next().await {
			let frame = frame.map_err(|e| Error::TransportError(format!("WebSocket read failed: {e}")))?;
			let message: Value = match frame {
				WsMessage::Text(text) => serde_json::from_str(&text)?,
				WsMessage::Binary(bytes) => serde_json::from_slice(&bytes)?,
				WsMessage::Close(_) => break,
				_ => continue,
			};
			if self.message_tx.send(message).is_err() {
				return Ok(());
			}
		}

		Err(Error::TransportError("WebSocket closed by driver".to_string()))
	}
}

#[cfg(test)]
mod tests;
