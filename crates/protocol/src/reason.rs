//! Kick and disconnect reason decoding.
//!
//! Servers send reasons either as plain text or as JSON chat components
//! (`{"text": "...", "extra": [{"text": "..."}]}`), sometimes double-encoded as
//! a JSON string. [`ReasonSummary::from_value`] normalises all of these.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Minimal chat component: enough to recover readable text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatComponent {
	#[serde(default)]
	pub text: Option<String>,
	#[serde(default)]
	pub translate: Option<String>,
	#[serde(default)]
	pub extra: Vec<ChatComponent>,
}

impl ChatComponent {
	/// Concatenated `text` of the `extra` children (one level, like vanilla
	/// disconnect screens render them).
	pub fn extra_text(&self) -> String {
		self.extra.iter().filter_map(|e| e.text.as_deref()).collect()
	}
}

/// Readable digest of a reason value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonSummary {
	/// Reason as received, rendered as a string.
	pub raw: String,
	/// Top-level component text, when the reason was structured.
	pub message: Option<String>,
	/// Joined `extra` text, when present and non-empty.
	pub additional: Option<String>,
}

impl ReasonSummary {
	pub fn from_value(value: &Value) -> Self {
		let raw = match value {
			Value::Null => "Unknown".to_string(),
			Value::String(s) => s.clone(),
			other => other.to_string(),
		};

		let component = match value {
			Value::String(s) => serde_json::from_str::<ChatComponent>(s).ok(),
			Value::Object(_) => serde_json::from_value::<ChatComponent>(value.clone()).ok(),
			_ => None,
		};

		let Some(component) = component else {
			return Self {
				raw,
				message: None,
				additional: None,
			};
		};

		let message = component.text.clone().or_else(|| component.translate.clone()).filter(|t| !t.is_empty());
		let additional = Some(component.extra_text()).filter(|t| !t.is_empty());

		Self { raw, message, additional }
	}

	/// Best single-line description: structured text when available, else raw.
	pub fn headline(&self) -> String {
		match (&self.message, &self.additional) {
			(Some(m), Some(a)) => format!("{m}{a}"),
			(Some(m), None) => m.clone(),
			(None, Some(a)) => a.clone(),
			(None, None) => self.raw.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn plain_text_reason_is_raw_only() {
		let summary = ReasonSummary::from_value(&json!("You have been idle for too long"));
		assert_eq!(summary.raw, "You have been idle for too long");
		assert!(summary.message.is_none());
		assert_eq!(summary.headline(), "You have been idle for too long");
	}

	#[test]
	fn json_string_reason_is_flattened() {
		let reason = json!(r#"{"text":"Kicked: ","extra":[{"text":"server "},{"text":"closed"}]}"#);
		let summary = ReasonSummary::from_value(&reason);
		assert_eq!(summary.message.as_deref(), Some("Kicked: "));
		assert_eq!(summary.additional.as_deref(), Some("server closed"));
		assert_eq!(summary.headline(), "Kicked: server closed");
	}

	#[test]
	fn object_reason_with_translate_key() {
		let summary = ReasonSummary::from_value(&json!({"translate": "multiplayer.disconnect.duplicate_login"}));
		assert_eq!(summary.message.as_deref(), Some("multiplayer.disconnect.duplicate_login"));
		assert!(summary.additional.is_none());
	}

	#[test]
	fn missing_reason_reads_unknown() {
		let summary = ReasonSummary::from_value(&Value::Null);
		assert_eq!(summary.headline(), "Unknown");
	}
}
