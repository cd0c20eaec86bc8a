//! Local error types.
//!
//! Only [`ConfigError`] is fatal. Connection failures never surface as errors
//! here; sessions classify them into [`crate::Failure`] and retry.

use afk_protocol::Edition;
use thiserror::Error;

/// Invalid configuration, detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	#[error("{key}={value:?} is not a valid port: {reason}")]
	InvalidPort {
		key: String,
		value: String,
		reason: String,
	},

	#[error("{key}={value:?} is not a boolean (expected true/false, 1/0, yes/no, on/off)")]
	InvalidBool { key: String, value: String },

	#[error("{key}={value:?} is not a whole number of seconds")]
	InvalidDuration { key: String, value: String },
}

impl ConfigError {
	/// Environment key the error concerns.
	pub fn key(&self) -> &str {
		match self {
			ConfigError::InvalidPort { key, .. }
			| ConfigError::InvalidBool { key, .. }
			| ConfigError::InvalidDuration { key, .. } => key,
		}
	}
}

/// Failure to hand a chat line to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
	/// The session exists but holds no connected link.
	#[error("not connected")]
	NotConnected,

	/// The session task is gone (stopped).
	#[error("session stopped")]
	Stopped,

	/// The driver rejected or failed to deliver the line.
	#[error("send failed: {0}")]
	Link(String),
}

/// Failure to route an operator line to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
	/// The requested edition has no session (disabled in configuration).
	#[error("{0} session is disabled")]
	Disabled(Edition),

	/// No edition is enabled at all.
	#[error("no sessions are running")]
	NoSession,

	/// The target session refused the line.
	#[error("{edition}: {source}")]
	Send {
		edition: Edition,
		#[source]
		source: SendError,
	},
}

impl RouteError {
	/// Edition the failure concerns, when there is one.
	pub fn edition(&self) -> Option<Edition> {
		match self {
			RouteError::Disabled(edition) | RouteError::Send { edition, .. } => Some(*edition),
			RouteError::NoSession => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn config_errors_name_key_and_value() {
		let err = ConfigError::InvalidPort {
			key: "BEDROCK_PORT".into(),
			value: "0".into(),
			reason: "port must be non-zero".into(),
		};
		assert_eq!(err.key(), "BEDROCK_PORT");
		let msg = err.to_string();
		assert!(msg.contains("BEDROCK_PORT"));
		assert!(msg.contains("\"0\""));
	}

	#[test]
	fn route_error_edition() {
		assert_eq!(RouteError::Disabled(Edition::Java).edition(), Some(Edition::Java));
		assert_eq!(RouteError::NoSession.edition(), None);
		let send = RouteError::Send {
			edition: Edition::Bedrock,
			source: SendError::NotConnected,
		};
		assert_eq!(send.edition(), Some(Edition::Bedrock));
		assert_eq!(send.to_string(), "bedrock: not connected");
	}
}
