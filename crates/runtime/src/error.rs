//! Error types for the driver runtime.

use afk_protocol::Edition;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reaching or talking to a driver.
#[derive(Debug, Error)]
pub enum Error {
	/// No driver endpoint could be resolved for the edition.
	#[error(
		"No {edition} driver found. Set {key} to a driver command or ws:// URL, or install {edition}.js into the drivers directory"
	)]
	DriverNotFound { edition: Edition, key: &'static str },

	/// Driver endpoint string could not be interpreted.
	#[error("Invalid driver endpoint '{0}'")]
	InvalidEndpoint(String),

	/// Failed to launch the driver process.
	#[error("Failed to launch driver: {0}")]
	LaunchFailed(String),

	/// Failed to establish a connection with the driver.
	#[error("Failed to connect to driver: {0}")]
	ConnectionFailed(String),

	/// Transport-level error (stdio or WebSocket communication).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Bridge protocol violation.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Timeout waiting for an operation.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// Channel to the driver closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		match self {
			Error::Timeout(_) => true,
			Error::Io(err) => err.kind() == std::io::ErrorKind::TimedOut,
			_ => false,
		}
	}

	/// Returns true if the peer actively refused the connection.
	pub fn is_refused(&self) -> bool {
		match self {
			Error::Io(err) => err.kind() == std::io::ErrorKind::ConnectionRefused,
			Error::ConnectionFailed(msg) => msg.contains("refused"),
			_ => false,
		}
	}
}
