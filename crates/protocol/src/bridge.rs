//! Bridge protocol between the bot and an edition driver.
//!
//! A driver wraps one edition's protocol library. The exchange is:
//!
//! 1. Bot sends [`DriverCommand::Connect`] with the resolved connection parameters
//! 2. Driver emits lifecycle events (`login`/`spawn`/`connect`, then eventually
//!    `kicked`, `disconnect`, `end` or `error`)
//! 3. Bot sends [`DriverCommand::Chat`] / [`DriverCommand::Write`] while connected
//! 4. Bot sends [`DriverCommand::Quit`] before tearing the driver down
//!
//! Events arrive as an [`Envelope`] (`{"event": ..., "params": {...}}`) and are
//! decoded into a typed [`DriverEvent`] with [`DriverEvent::from_envelope`].
//! Unrecognised event names decode to [`DriverEvent::Unknown`] so newer drivers
//! keep working against older bots.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent from the bot to a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum DriverCommand {
	/// Open the game connection described by the parameters.
	Connect(ConnectParams),
	/// Send a chat line as the bot.
	Chat {
		/// Literal text to send.
		message: String,
	},
	/// Write an arbitrary protocol message (used for keep-alive traffic).
	Write {
		/// Protocol packet name, e.g. `tick_sync`.
		name: String,
		/// Packet fields.
		params: Value,
	},
	/// Leave the server and release the connection.
	Quit {
		/// Reason forwarded to the server when the protocol supports one.
		reason: String,
	},
}

/// Connection parameters forwarded to the driver's `connect` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
	pub host: String,
	pub port: u16,
	pub username: String,
	/// Protocol version string, e.g. `1.21.70`.
	pub version: String,
	/// Authentication mode (`microsoft`, `offline`); Java only.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub auth: Option<String>,
}

/// Raw event frame as emitted by a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	/// Event name, e.g. `login`, `kicked`, `chat`.
	pub event: String,
	/// Event payload; absent for bare lifecycle signals.
	#[serde(default)]
	pub params: Value,
}

/// Decoded driver event.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
	/// Java handshake completed (player logged in).
	Login(Handshake),
	/// Player entity spawned in the world.
	Spawn(Handshake),
	/// Bedrock handshake completed.
	Connect(Handshake),
	/// Server kicked the bot.
	Kicked(Kick),
	/// Server-initiated disconnect (Bedrock disconnect packet).
	Disconnect(ReasonParams),
	/// Underlying connection ended.
	End(ReasonParams),
	/// Transport or protocol error reported by the library.
	Error(DriverError),
	/// Player chat (Java `chat` event, Bedrock `chat` packet).
	Chat(ChatMessage),
	/// Bedrock `text` packet.
	Text(TextMessage),
	/// Event this bot does not understand.
	Unknown(Envelope),
}

impl DriverEvent {
	/// Decodes an envelope into a typed event.
	///
	/// Returns an error only when a known event carries a malformed payload.
	pub fn from_envelope(envelope: Envelope) -> Result<Self, serde_json::Error> {
		let params = match &envelope.params {
			Value::Null => Value::Object(Default::default()),
			other => other.clone(),
		};

		Ok(match envelope.event.as_str() {
			"login" => DriverEvent::Login(serde_json::from_value(params)?),
			"spawn" => DriverEvent::Spawn(serde_json::from_value(params)?),
			"connect" => DriverEvent::Connect(serde_json::from_value(params)?),
			"kicked" => DriverEvent::Kicked(serde_json::from_value(params)?),
			"disconnect" => DriverEvent::Disconnect(serde_json::from_value(params)?),
			"end" => DriverEvent::End(serde_json::from_value(params)?),
			"error" => DriverEvent::Error(serde_json::from_value(params)?),
			"chat" => DriverEvent::Chat(serde_json::from_value(params)?),
			"text" => DriverEvent::Text(serde_json::from_value(params)?),
			_ => DriverEvent::Unknown(envelope),
		})
	}

	/// Event name as it appears on the wire.
	pub fn name(&self) -> &str {
		match self {
			DriverEvent::Login(_) => "login",
			DriverEvent::Spawn(_) => "spawn",
			DriverEvent::Connect(_) => "connect",
			DriverEvent::Kicked(_) => "kicked",
			DriverEvent::Disconnect(_) => "disconnect",
			DriverEvent::End(_) => "end",
			DriverEvent::Error(_) => "error",
			DriverEvent::Chat(_) => "chat",
			DriverEvent::Text(_) => "text",
			DriverEvent::Unknown(envelope) => envelope.event.as_str(),
		}
	}

	/// Handshake payload, for the lifecycle events that carry one.
	pub fn handshake(&self) -> Option<&Handshake> {
		match self {
			DriverEvent::Login(h) | DriverEvent::Spawn(h) | DriverEvent::Connect(h) => Some(h),
			_ => None,
		}
	}
}

/// Payload of the `login`, `spawn` and `connect` events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
	/// Name the server knows the bot by. May differ from the configured
	/// account name when logging in through an account service.
	#[serde(default)]
	pub username: Option<String>,
}

impl Handshake {
	pub fn named(username: impl Into<String>) -> Self {
		Self {
			username: Some(username.into()),
		}
	}
}

/// Payload of a `kicked` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kick {
	/// Kick reason: plain text, a JSON chat component, or a JSON string of one.
	#[serde(default)]
	pub reason: Value,
	/// Whether the bot had completed login before being kicked.
	#[serde(default)]
	pub logged_in: Option<bool>,
}

/// Payload of `disconnect` and `end` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasonParams {
	#[serde(default)]
	pub reason: Option<Value>,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverError {
	/// Error class name, e.g. `Error`, `TimeoutError`.
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub message: String,
	/// System error code, e.g. `ECONNREFUSED`.
	#[serde(default)]
	pub code: Option<String>,
	/// Per-address failures of an aggregate error.
	#[serde(default)]
	pub errors: Vec<NestedError>,
	#[serde(default)]
	pub stack: Option<String>,
}

/// One member of an aggregate connection error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedError {
	#[serde(default)]
	pub message: String,
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
}

/// Payload of a `chat` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
	#[serde(alias = "sender", alias = "source_name")]
	pub username: String,
	pub message: String,
}

/// Payload of a Bedrock `text` packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
	#[serde(default, alias = "source_name")]
	pub source: Option<String>,
	pub message: String,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn decode(value: Value) -> DriverEvent {
		let envelope: Envelope = serde_json::from_value(value).unwrap();
		DriverEvent::from_envelope(envelope).unwrap()
	}

	#[test]
	fn connect_command_serializes_with_method_and_params() {
		let command = DriverCommand::Connect(ConnectParams {
			host: "localhost".to_string(),
			port: 25565,
			username: "AFKBot".to_string(),
			version: "1.21.70".to_string(),
			auth: Some("microsoft".to_string()),
		});

		let value = serde_json::to_value(&command).unwrap();
		assert_eq!(value["method"], "connect");
		assert_eq!(value["params"]["host"], "localhost");
		assert_eq!(value["params"]["port"], 25565);
		assert_eq!(value["params"]["auth"], "microsoft");
	}

	#[test]
	fn connect_command_omits_missing_auth() {
		let command = DriverCommand::Connect(ConnectParams {
			host: "h".to_string(),
			port: 19132,
			username: "BedrockAFKBot".to_string(),
			version: "1.21.70".to_string(),
			auth: None,
		});

		let value = serde_json::to_value(&command).unwrap();
		assert!(value["params"].get("auth").is_none());
	}

	#[test]
	fn chat_and_quit_commands_use_struct_params() {
		let chat = serde_json::to_value(DriverCommand::Chat { message: "hello".to_string() }).unwrap();
		assert_eq!(chat, json!({"method": "chat", "params": {"message": "hello"}}));

		let quit = serde_json::to_value(DriverCommand::Quit { reason: "bye".to_string() }).unwrap();
		assert_eq!(quit, json!({"method": "quit", "params": {"reason": "bye"}}));
	}

	#[test]
	fn bare_lifecycle_events_decode_without_params() {
		assert_eq!(decode(json!({"event": "login"})), DriverEvent::Login(Handshake::default()));
		assert_eq!(decode(json!({"event": "spawn", "params": null})), DriverEvent::Spawn(Handshake::default()));
		assert_eq!(decode(json!({"event": "connect", "params": {}})), DriverEvent::Connect(Handshake::default()));
	}

	#[test]
	fn handshake_carries_assigned_username() {
		let event = decode(json!({"event": "login", "params": {"username": "RealName", "uuid": "abc"}}));
		assert_eq!(event, DriverEvent::Login(Handshake::named("RealName")));
		assert_eq!(event.handshake().and_then(|h| h.username.as_deref()), Some("RealName"));
		assert!(DriverEvent::End(ReasonParams::default()).handshake().is_none());
	}

	#[test]
	fn end_event_without_reason_decodes() {
		assert_eq!(decode(json!({"event": "end"})), DriverEvent::End(ReasonParams::default()));
	}

	#[test]
	fn error_event_carries_code_and_nested_errors() {
		let event = decode(json!({
			"event": "error",
			"params": {
				"name": "AggregateError",
				"message": "connect failed",
				"code": "ECONNREFUSED",
				"errors": [{"message": "refused", "code": "ECONNREFUSED", "address": "::1", "port": 25565}]
			}
		}));

		let DriverEvent::Error(error) = event else {
			panic!("expected error event");
		};
		assert_eq!(error.code.as_deref(), Some("ECONNREFUSED"));
		assert_eq!(error.errors.len(), 1);
		assert_eq!(error.errors[0].port, Some(25565));
	}

	#[test]
	fn chat_accepts_sender_alias() {
		let event = decode(json!({"event": "chat", "params": {"sender": "Steve", "message": "hi"}}));
		assert_eq!(
			event,
			DriverEvent::Chat(ChatMessage {
				username: "Steve".to_string(),
				message: "hi".to_string(),
			})
		);
	}

	#[test]
	fn text_source_is_optional() {
		let event = decode(json!({"event": "text", "params": {"message": "Server restarting"}}));
		let DriverEvent::Text(text) = event else {
			panic!("expected text event");
		};
		assert!(text.source.is_none());
	}

	#[test]
	fn unknown_events_are_preserved() {
		let event = decode(json!({"event": "health", "params": {"food": 20}}));
		assert_eq!(event.name(), "health");
		assert!(matches!(event, DriverEvent::Unknown(_)));
	}

	#[test]
	fn malformed_known_payload_is_an_error() {
		let envelope = Envelope {
			event: "chat".to_string(),
			params: json!({"message": 42}),
		};
		assert!(DriverEvent::from_envelope(envelope).is_err());
	}
}
