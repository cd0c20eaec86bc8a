//! Game edition selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two protocol editions a bot can maintain a presence on.
///
/// Java is the stateful, authenticated edition. Bedrock is the lightweight
/// datagram edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
	/// Stateful edition (TCP, session/auth heavy).
	Java,
	/// Datagram edition (UDP-based, lightweight handshake).
	Bedrock,
}

impl Edition {
	/// Every edition, in startup order.
	pub const ALL: [Edition; 2] = [Edition::Java, Edition::Bedrock];

	/// Lowercase name used in commands and driver file names.
	pub fn name(self) -> &'static str {
		match self {
			Edition::Java => "java",
			Edition::Bedrock => "bedrock",
		}
	}

	/// Bracketed tag prefixed to every log line about this edition.
	pub fn tag(self) -> &'static str {
		match self {
			Edition::Java => "[JAVA]",
			Edition::Bedrock => "[BEDROCK]",
		}
	}

	/// Prefix for this edition's environment keys (`BEDROCK_PORT`, ...).
	///
	/// Java keys are unprefixed (`HOST`, `PORT`, ...).
	pub fn env_prefix(self) -> &'static str {
		match self {
			Edition::Java => "",
			Edition::Bedrock => "BEDROCK_",
		}
	}

	pub fn is_stateful(self) -> bool {
		matches!(self, Edition::Java)
	}
}

impl fmt::Display for Edition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Returned when a string names no known edition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEditionError(pub String);

impl fmt::Display for ParseEditionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unknown edition '{}' (expected java or bedrock)", self.0)
	}
}

impl std::error::Error for ParseEditionError {}

impl FromStr for Edition {
	type Err = ParseEditionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"java" | "stateful" => Ok(Edition::Java),
			"bedrock" | "datagram" => Ok(Edition::Bedrock),
			_ => Err(ParseEditionError(s.to_string())),
		}
	}
}
