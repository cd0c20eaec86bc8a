//! Connection failure taxonomy.
//!
//! Every way a connection attempt or a live connection can end is folded into
//! a [`Failure`]. Classification looks at structured error codes first and
//! falls back to message text, since protocol libraries are inconsistent about
//! which of the two they populate. Authentication failures exist only for the
//! stateful edition; the datagram edition has no account login to fail, so
//! text that mentions authentication is an ordinary kick or error there.

use std::fmt;

use afk_protocol::{DriverError, Edition, Kick, ReasonParams, ReasonSummary};

use crate::config::SessionConfig;

/// Version ranges the Bedrock servers this bot targets accept.
const BEDROCK_SUPPORTED_VERSIONS: &str = "1.21.50-1.21.51, 1.21.60-1.21.62, 1.21.70";

/// Why a connection ended or never came up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
	/// Server unreachable or actively refusing.
	TransportRefused { detail: String },
	/// Handshake did not complete in time.
	TransportTimeout { detail: String },
	/// Server and bot disagree on the protocol version.
	ProtocolVersionMismatch { detail: String },
	/// Account could not be authenticated.
	AuthenticationFailure { detail: String },
	/// Server kicked or disconnected the bot.
	Kicked { reason: ReasonSummary },
	/// Connection ended without an error.
	Ended { reason: String },
	/// Any other driver or link error.
	Transport { detail: String },
}

impl Failure {
	/// Classifies an error raised while reaching the driver or sending to it.
	pub fn from_runtime(edition: Edition, err: &afk_runtime::Error) -> Self {
		let detail = err.to_string();
		if err.is_refused() {
			return Failure::TransportRefused { detail };
		}
		if err.is_timeout() {
			return Failure::TransportTimeout { detail };
		}
		match err {
			afk_runtime::Error::DriverNotFound { .. } | afk_runtime::Error::LaunchFailed(_) => {
				Failure::Transport { detail }
			}
			_ => classify_text(edition, &detail).unwrap_or(Failure::Transport { detail }),
		}
	}

	/// Classifies an `error` event reported by the driver.
	pub fn from_driver_error(edition: Edition, err: &DriverError) -> Self {
		let detail = if err.message.is_empty() {
			err.name.clone().unwrap_or_else(|| "unknown error".to_string())
		} else {
			err.message.clone()
		};

		let codes = err
			.code
			.iter()
			.chain(err.errors.iter().filter_map(|e| e.code.as_ref()))
			.map(String::as_str);
		for code in codes {
			match code {
				"ECONNREFUSED" | "EHOSTUNREACH" | "ENETUNREACH" | "ENOTFOUND" => {
					return Failure::TransportRefused { detail };
				}
				"ETIMEDOUT" | "ESOCKETTIMEDOUT" => return Failure::TransportTimeout { detail },
				_ => {}
			}
		}

		if err.name.as_deref() == Some("TimeoutError") {
			return Failure::TransportTimeout { detail };
		}

		classify_text(edition, &detail).unwrap_or(Failure::Transport { detail })
	}

	/// Classifies a `kicked` event.
	///
	/// Servers announce version and authentication problems as kicks, so the
	/// reason text is inspected before settling on [`Failure::Kicked`].
	pub fn from_kick(edition: Edition, kick: &Kick) -> Self {
		Self::from_reason(edition, ReasonSummary::from_value(&kick.reason))
	}

	/// Classifies a server-initiated `disconnect` event.
	pub fn from_disconnect(edition: Edition, params: &ReasonParams) -> Self {
		let reason = params.reason.clone().unwrap_or_default();
		Self::from_reason(edition, ReasonSummary::from_value(&reason))
	}

	/// Classifies an `end` event.
	pub fn from_end(params: &ReasonParams) -> Self {
		let reason = match &params.reason {
			Some(value) => ReasonSummary::from_value(value).headline(),
			None => "Unknown".to_string(),
		};
		Failure::Ended { reason }
	}

	fn from_reason(edition: Edition, reason: ReasonSummary) -> Self {
		let headline = reason.headline();
		match classify_text(edition, &headline) {
			Some(Failure::ProtocolVersionMismatch { .. }) => Failure::ProtocolVersionMismatch { detail: headline },
			Some(Failure::AuthenticationFailure { .. }) => Failure::AuthenticationFailure { detail: headline },
			_ => Failure::Kicked { reason },
		}
	}

	/// Short cause name for log fields.
	pub fn cause(&self) -> &'static str {
		match self {
			Failure::TransportRefused { .. } => "connection refused",
			Failure::TransportTimeout { .. } => "timed out",
			Failure::ProtocolVersionMismatch { .. } => "version mismatch",
			Failure::AuthenticationFailure { .. } => "authentication failed",
			Failure::Kicked { .. } => "kicked",
			Failure::Ended { .. } => "connection ended",
			Failure::Transport { .. } => "transport error",
		}
	}

	/// Raw detail as received.
	pub fn detail(&self) -> String {
		match self {
			Failure::TransportRefused { detail }
			| Failure::TransportTimeout { detail }
			| Failure::ProtocolVersionMismatch { detail }
			| Failure::AuthenticationFailure { detail }
			| Failure::Transport { detail } => detail.clone(),
			Failure::Kicked { reason } => reason.raw.clone(),
			Failure::Ended { reason } => reason.clone(),
		}
	}

	pub fn is_version_mismatch(&self) -> bool {
		matches!(self, Failure::ProtocolVersionMismatch { .. })
	}

	/// Whether the failure is an expected end of a connection rather than an error.
	pub fn is_routine(&self) -> bool {
		matches!(self, Failure::Kicked { .. } | Failure::Ended { .. })
	}

	/// Operator guidance for recognisable causes. Empty when there is none.
	pub fn hints(&self, config: &SessionConfig) -> Vec<String> {
		let address = config.address();
		match self {
			Failure::TransportRefused { .. } => vec![
				format!("Connection refused to {address}"),
				"Possible causes:".to_string(),
				"1. The Minecraft server is not running".to_string(),
				"2. The server address or port is incorrect".to_string(),
				"3. The server is blocking connections from this IP".to_string(),
				"4. Firewall is blocking the connection".to_string(),
			],
			Failure::TransportTimeout { .. } => vec![
				format!("Connection to {address} timed out"),
				"The server may be offline, overloaded, or unreachable through a firewall".to_string(),
			],
			Failure::ProtocolVersionMismatch { .. } => {
				let key = format!("{}VERSION", config.edition.env_prefix());
				let mut lines = vec![format!(
					"Version compatibility issue detected (tried {}). Please update {key} in your environment.",
					config.version
				)];
				if config.edition == Edition::Bedrock {
					lines.push(format!("Server supports: {BEDROCK_SUPPORTED_VERSIONS}"));
				}
				lines
			}
			Failure::AuthenticationFailure { .. } => vec![
				format!("Authentication failed for {}", config.username),
				match &config.auth {
					Some(auth) => format!("AUTH is '{auth}'; check the account can sign in, or use AUTH=offline for offline-mode servers"),
					None => "No AUTH mode is set; online-mode servers need AUTH=microsoft".to_string(),
				},
			],
			_ => Vec::new(),
		}
	}
}

impl fmt::Display for Failure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Failure::Kicked { reason } => write!(f, "kicked: {}", reason.headline()),
			Failure::Ended { reason } => write!(f, "connection ended: {reason}"),
			other => write!(f, "{}: {}", other.cause(), other.detail()),
		}
	}
}

/// Text heuristics shared by every classifier.
fn classify_text(edition: Edition, text: &str) -> Option<Failure> {
	let lower = text.to_ascii_lowercase();
	let detail = text.to_string();

	if lower.contains("econnrefused") || lower.contains("connection refused") {
		return Some(Failure::TransportRefused { detail });
	}
	if lower.contains("timed out") || lower.contains("timeout") || lower.contains("etimedout") {
		return Some(Failure::TransportTimeout { detail });
	}
	if lower.contains("version") || lower.contains("outdated") {
		return Some(Failure::ProtocolVersionMismatch { detail });
	}
	if !edition.is_stateful() {
		return None;
	}
	if lower.contains("auth") || lower.contains("invalid session") || lower.contains("failed to verify username") {
		return Some(Failure::AuthenticationFailure { detail });
	}
	None
}
