//! Per-edition behaviour.
//!
//! A [`ProtocolSession`](crate::ProtocolSession) is generic; everything that
//! differs between the editions lives in an [`EditionProfile`].

use std::time::Duration;

use afk_protocol::{DriverEvent, Edition};
use serde_json::{Value, json};

/// Fixed chat trigger and the line sent back when it is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoReply {
	pub trigger: &'static str,
	pub reply: &'static str,
}

/// Static description of one edition's connection behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditionProfile {
	pub edition: Edition,
	/// Driver events that mean the handshake succeeded.
	pub handshake_events: &'static [&'static str],
	pub default_port: u16,
	pub default_username: &'static str,
	pub default_retry_delay: Duration,
	/// `None` when the edition needs no keep-alive traffic.
	pub default_keepalive: Option<Duration>,
	/// `None` when connection attempts are not bounded by a watchdog.
	pub default_connect_timeout: Option<Duration>,
	pub default_fallback_version: Option<&'static str>,
	pub uses_auth: bool,
	pub auto_reply: Option<AutoReply>,
}

pub const JAVA: EditionProfile = EditionProfile {
	edition: Edition::Java,
	handshake_events: &["login", "spawn"],
	default_port: 25565,
	default_username: "AFKBot",
	default_retry_delay: Duration::from_secs(5),
	default_keepalive: None,
	default_connect_timeout: None,
	default_fallback_version: None,
	uses_auth: true,
	auto_reply: Some(AutoReply {
		trigger: "!ping",
		reply: "Pong! I am a Java AFK bot.",
	}),
};

pub const BEDROCK: EditionProfile = EditionProfile {
	edition: Edition::Bedrock,
	handshake_events: &["spawn", "connect"],
	default_port: 19132,
	default_username: "BedrockAFKBot",
	default_retry_delay: Duration::from_secs(10),
	default_keepalive: Some(Duration::from_secs(30)),
	default_connect_timeout: Some(Duration::from_secs(20)),
	default_fallback_version: Some("1.21.70"),
	uses_auth: false,
	auto_reply: None,
};

/// Default protocol version for both editions.
pub const DEFAULT_VERSION: &str = "1.21.70";

/// Name of the packet written as keep-alive traffic.
pub const KEEPALIVE_PACKET: &str = "tick_sync";

impl EditionProfile {
	pub fn for_edition(edition: Edition) -> &'static EditionProfile {
		match edition {
			Edition::Java => &JAVA,
			Edition::Bedrock => &BEDROCK,
		}
	}

	/// Whether `event` completes this edition's handshake.
	pub fn is_handshake(&self, event: &DriverEvent) -> bool {
		self.handshake_events.contains(&event.name())
	}

	/// Reply to send for an inbound chat line, if any.
	///
	/// The trigger matches case-insensitively on the trimmed message and never
	/// fires for the bot's own lines.
	pub fn reply_to(&self, sender: &str, message: &str, own_username: &str) -> Option<&'static str> {
		let auto = self.auto_reply?;
		if sender == own_username {
			return None;
		}
		message.trim().eq_ignore_ascii_case(auto.trigger).then_some(auto.reply)
	}

	/// Keep-alive packet fields for a tick sent at `now_ms`.
	pub fn keepalive_params(now_ms: u64) -> Value {
		json!({
			"request_time": now_ms,
			"response_time": 0,
		})
	}
}

#[cfg(test)]
mod tests {
	use afk_protocol::{ChatMessage, ReasonParams};

	use super::*;

	#[test]
	fn handshake_events_per_edition() {
		assert!(JAVA.is_handshake(&DriverEvent::Login(Default::default())));
		assert!(JAVA.is_handshake(&DriverEvent::Spawn(Default::default())));
		assert!(!JAVA.is_handshake(&DriverEvent::Connect(Default::default())));

		assert!(BEDROCK.is_handshake(&DriverEvent::Spawn(Default::default())));
		assert!(BEDROCK.is_handshake(&DriverEvent::Connect(Default::default())));
		assert!(!BEDROCK.is_handshake(&DriverEvent::Login(Default::default())));
		assert!(!BEDROCK.is_handshake(&DriverEvent::End(ReasonParams::default())));
		assert!(!BEDROCK.is_handshake(&DriverEvent::Chat(ChatMessage {
			username: "x".into(),
			message: "y".into(),
		})));
	}

	#[test]
	fn ping_reply_is_case_insensitive() {
		assert_eq!(JAVA.reply_to("Steve", "!PING", "AFKBot"), Some("Pong! I am a Java AFK bot."));
		assert_eq!(JAVA.reply_to("Steve", " !ping ", "AFKBot"), Some("Pong! I am a Java AFK bot."));
		assert_eq!(JAVA.reply_to("Steve", "!ping please", "AFKBot"), None);
	}

	#[test]
	fn own_messages_never_trigger() {
		assert_eq!(JAVA.reply_to("AFKBot", "!ping", "AFKBot"), None);
	}

	#[test]
	fn bedrock_has_no_auto_reply() {
		assert_eq!(BEDROCK.reply_to("Steve", "!ping", "BedrockAFKBot"), None);
	}

	#[test]
	fn keepalive_shape() {
		let params = EditionProfile::keepalive_params(1_700_000_000_000);
		assert_eq!(params["request_time"], 1_700_000_000_000u64);
		assert_eq!(params["response_time"], 0);
	}

	#[test]
	fn lookup_by_edition() {
		assert_eq!(EditionProfile::for_edition(Edition::Java).default_port, 25565);
		assert_eq!(EditionProfile::for_edition(Edition::Bedrock).default_port, 19132);
	}
}
