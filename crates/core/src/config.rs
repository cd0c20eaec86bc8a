//! Configuration resolution.
//!
//! Everything comes from a key/value lookup: the process environment in
//! production, a map in tests. Every key is optional. Java keys are mostly
//! unprefixed (`HOST`, `PORT`, ...) while Bedrock keys carry `BEDROCK_`.
//! No `.env` file is read; keys must be in the process environment.
//!
//! | Key | Default |
//! |-----|---------|
//! | `JAVA_ENABLED` / `BEDROCK_ENABLED` | `false` |
//! | `HOST` / `BEDROCK_HOST` | `localhost` (Bedrock falls back to `HOST`) |
//! | `PORT` / `BEDROCK_PORT` | `25565` / `19132` |
//! | `USERNAME` / `BEDROCK_USERNAME` | `AFKBot` / `BedrockAFKBot` |
//! | `VERSION` / `BEDROCK_VERSION` | `1.21.70` |
//! | `AUTH` | `microsoft` (empty for none) |
//! | `JAVA_FALLBACK_VERSION` / `BEDROCK_FALLBACK_VERSION` | unset / `1.21.70` |
//! | `JAVA_DRIVER` / `BEDROCK_DRIVER` | unset (discovered) |
//! | `JAVA_RETRY_SECS` / `BEDROCK_RETRY_SECS` | `5` / `10` |
//! | `BEDROCK_KEEPALIVE_SECS` | `30`, `0` disables |
//! | `BEDROCK_CONNECT_TIMEOUT_SECS` | `20`, `0` disables |
//! | `BEDROCK_SETTLE_SECS` | `10` |

use std::time::Duration;

use afk_protocol::{ConnectParams, Edition};
use serde_json::{Value, json};

use crate::error::ConfigError;
use crate::profile::{DEFAULT_VERSION, EditionProfile};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_AUTH: &str = "microsoft";
const DEFAULT_SETTLE: Duration = Duration::from_secs(10);

/// Resolved parameters for one edition's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
	pub edition: Edition,
	pub host: String,
	pub port: u16,
	pub username: String,
	pub version: String,
	/// Authentication mode; Java only.
	pub auth: Option<String>,
	/// Version tried once after a version mismatch.
	pub fallback_version: Option<String>,
	/// Explicit driver endpoint; discovered when `None`.
	pub driver: Option<String>,
	pub retry_delay: Duration,
	pub keepalive_interval: Option<Duration>,
	pub connect_timeout: Option<Duration>,
}

impl SessionConfig {
	/// Config for `edition` with every field at its default.
	pub fn defaults(edition: Edition) -> Self {
		let profile = EditionProfile::for_edition(edition);
		Self {
			edition,
			host: DEFAULT_HOST.to_string(),
			port: profile.default_port,
			username: profile.default_username.to_string(),
			version: DEFAULT_VERSION.to_string(),
			auth: profile.uses_auth.then(|| DEFAULT_AUTH.to_string()),
			fallback_version: profile.default_fallback_version.map(str::to_string),
			driver: None,
			retry_delay: profile.default_retry_delay,
			keepalive_interval: profile.default_keepalive,
			connect_timeout: profile.default_connect_timeout,
		}
	}

	/// `host:port` for log lines.
	pub fn address(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	/// Parameters for the driver's `connect` command.
	pub fn connect_params(&self) -> ConnectParams {
		ConnectParams {
			host: self.host.clone(),
			port: self.port,
			username: self.username.clone(),
			version: self.version.clone(),
			auth: self.auth.clone(),
		}
	}

	/// Connection parameters as a JSON object for logging.
	pub fn summary(&self) -> Value {
		let mut summary = json!({
			"host": self.host,
			"port": self.port,
			"username": self.username,
			"version": self.version,
		});
		if let Some(auth) = &self.auth {
			summary["auth"] = json!(auth);
		}
		summary
	}
}

/// Configuration for the whole bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
	/// `None` when the edition is disabled.
	pub java: Option<SessionConfig>,
	pub bedrock: Option<SessionConfig>,
	/// Pause between Java's first login and Bedrock's first attempt.
	pub settle_delay: Duration,
}

impl BotConfig {
	/// Resolves configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Resolves configuration from an arbitrary lookup.
	///
	/// Blank values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let env = Env { lookup };

		let java = if env.flag("JAVA_ENABLED")? {
			Some(resolve(&env, Edition::Java)?)
		} else {
			None
		};
		let bedrock = if env.flag("BEDROCK_ENABLED")? {
			Some(resolve(&env, Edition::Bedrock)?)
		} else {
			None
		};
		let settle_delay = env.secs("BEDROCK_SETTLE_SECS")?.unwrap_or(DEFAULT_SETTLE);

		Ok(Self {
			java,
			bedrock,
			settle_delay,
		})
	}

	pub fn session(&self, edition: Edition) -> Option<&SessionConfig> {
		match edition {
			Edition::Java => self.java.as_ref(),
			Edition::Bedrock => self.bedrock.as_ref(),
		}
	}

	/// Overrides the driver endpoint of an enabled edition.
	pub fn set_driver(&mut self, edition: Edition, endpoint: String) {
		let session = match edition {
			Edition::Java => self.java.as_mut(),
			Edition::Bedrock => self.bedrock.as_mut(),
		};
		if let Some(session) = session {
			session.driver = Some(endpoint);
		}
	}
}

fn resolve<F>(env: &Env<F>, edition: Edition) -> Result<SessionConfig, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let mut config = SessionConfig::defaults(edition);
	let prefix = edition.env_prefix();
	let scoped = |suffix: &str| format!("{}_{suffix}", edition.name().to_ascii_uppercase());

	config.host = match edition {
		Edition::Java => env.get("HOST"),
		Edition::Bedrock => env.get("BEDROCK_HOST").or_else(|| env.get("HOST")),
	}
	.unwrap_or(config.host);

	if let Some(port) = env.port(&format!("{prefix}PORT"))? {
		config.port = port;
	}
	if let Some(username) = env.get(&format!("{prefix}USERNAME")) {
		config.username = username;
	}
	if let Some(version) = env.get(&format!("{prefix}VERSION")) {
		config.version = version;
	}
	if edition.is_stateful() {
		config.auth = match env.raw("AUTH") {
			Some(auth) if auth.trim().is_empty() => None,
			Some(auth) => Some(auth.trim().to_string()),
			None => config.auth,
		};
	}
	if let Some(fallback) = env.get(&scoped("FALLBACK_VERSION")) {
		config.fallback_version = Some(fallback);
	}
	config.driver = env.get(&scoped("DRIVER"));
	if let Some(delay) = env.secs(&scoped("RETRY_SECS"))? {
		config.retry_delay = delay;
	}
	if !edition.is_stateful() {
		if let Some(interval) = env.secs("BEDROCK_KEEPALIVE_SECS")? {
			config.keepalive_interval = (!interval.is_zero()).then_some(interval);
		}
		if let Some(timeout) = env.secs("BEDROCK_CONNECT_TIMEOUT_SECS")? {
			config.connect_timeout = (!timeout.is_zero()).then_some(timeout);
		}
	}

	Ok(config)
}

struct Env<F> {
	lookup: F,
}

impl<F> Env<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn raw(&self, key: &str) -> Option<String> {
		(self.lookup)(key)
	}

	fn get(&self, key: &str) -> Option<String> {
		self.raw(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
	}

	fn flag(&self, key: &str) -> Result<bool, ConfigError> {
		let Some(value) = self.get(key) else {
			return Ok(false);
		};
		match value.to_ascii_lowercase().as_str() {
			"true" | "1" | "yes" | "on" => Ok(true),
			"false" | "0" | "no" | "off" => Ok(false),
			_ => Err(ConfigError::InvalidBool {
				key: key.to_string(),
				value,
			}),
		}
	}

	fn port(&self, key: &str) -> Result<Option<u16>, ConfigError> {
		let Some(value) = self.get(key) else {
			return Ok(None);
		};
		let invalid = |reason: String| ConfigError::InvalidPort {
			key: key.to_string(),
			value: value.clone(),
			reason,
		};
		match value.parse::<u16>() {
			Ok(0) => Err(invalid("port must be non-zero".to_string())),
			Ok(port) => Ok(Some(port)),
			Err(e) => Err(invalid(e.to_string())),
		}
	}

	fn secs(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
		let Some(value) = self.get(key) else {
			return Ok(None);
		};
		value
			.parse::<u64>()
			.map(|secs| Some(Duration::from_secs(secs)))
			.map_err(|_| ConfigError::InvalidDuration {
				key: key.to_string(),
				value,
			})
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn config(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
		let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		BotConfig::from_lookup(|key| map.get(key).cloned())
	}

	#[test]
	fn everything_disabled_by_default() {
		let cfg = config(&[]).unwrap();
		assert!(cfg.java.is_none());
		assert!(cfg.bedrock.is_none());
		assert_eq!(cfg.settle_delay, Duration::from_secs(10));
	}

	#[test]
	fn java_defaults() {
		let cfg = config(&[("JAVA_ENABLED", "true")]).unwrap();
		let java = cfg.java.unwrap();
		assert_eq!(java.host, "localhost");
		assert_eq!(java.port, 25565);
		assert_eq!(java.username, "AFKBot");
		assert_eq!(java.version, "1.21.70");
		assert_eq!(java.auth.as_deref(), Some("microsoft"));
		assert_eq!(java.fallback_version, None);
		assert_eq!(java.retry_delay, Duration::from_secs(5));
		assert_eq!(java.keepalive_interval, None);
		assert_eq!(java.connect_timeout, None);
	}

	#[test]
	fn bedrock_defaults() {
		let cfg = config(&[("BEDROCK_ENABLED", "yes")]).unwrap();
		let bedrock = cfg.bedrock.unwrap();
		assert_eq!(bedrock.host, "localhost");
		assert_eq!(bedrock.port, 19132);
		assert_eq!(bedrock.username, "BedrockAFKBot");
		assert_eq!(bedrock.auth, None);
		assert_eq!(bedrock.fallback_version.as_deref(), Some("1.21.70"));
		assert_eq!(bedrock.retry_delay, Duration::from_secs(10));
		assert_eq!(bedrock.keepalive_interval, Some(Duration::from_secs(30)));
		assert_eq!(bedrock.connect_timeout, Some(Duration::from_secs(20)));
	}

	#[test]
	fn bedrock_host_falls_back_to_java_host() {
		let cfg = config(&[("BEDROCK_ENABLED", "1"), ("HOST", "mc.example.net")]).unwrap();
		assert_eq!(cfg.bedrock.unwrap().host, "mc.example.net");

		let cfg = config(&[
			("BEDROCK_ENABLED", "1"),
			("HOST", "mc.example.net"),
			("BEDROCK_HOST", "be.example.net"),
		])
		.unwrap();
		assert_eq!(cfg.bedrock.unwrap().host, "be.example.net");
	}

	#[test]
	fn overrides_apply() {
		let cfg = config(&[
			("JAVA_ENABLED", "ON"),
			("PORT", "25570"),
			("USERNAME", "Idler"),
			("VERSION", "1.20.4"),
			("AUTH", "offline"),
			("JAVA_FALLBACK_VERSION", "1.20.1"),
			("JAVA_DRIVER", "ws://127.0.0.1:9000"),
			("JAVA_RETRY_SECS", "2"),
		])
		.unwrap();
		let java = cfg.java.unwrap();
		assert_eq!(java.port, 25570);
		assert_eq!(java.username, "Idler");
		assert_eq!(java.version, "1.20.4");
		assert_eq!(java.auth.as_deref(), Some("offline"));
		assert_eq!(java.fallback_version.as_deref(), Some("1.20.1"));
		assert_eq!(java.driver.as_deref(), Some("ws://127.0.0.1:9000"));
		assert_eq!(java.retry_delay, Duration::from_secs(2));
	}

	#[test]
	fn empty_auth_means_none() {
		let cfg = config(&[("JAVA_ENABLED", "true"), ("AUTH", "")]).unwrap();
		assert_eq!(cfg.java.unwrap().auth, None);
	}

	#[test]
	fn zero_disables_keepalive_and_watchdog() {
		let cfg = config(&[
			("BEDROCK_ENABLED", "true"),
			("BEDROCK_KEEPALIVE_SECS", "0"),
			("BEDROCK_CONNECT_TIMEOUT_SECS", "0"),
		])
		.unwrap();
		let bedrock = cfg.bedrock.unwrap();
		assert_eq!(bedrock.keepalive_interval, None);
		assert_eq!(bedrock.connect_timeout, None);
	}

	#[test]
	fn bad_port_is_fatal() {
		let err = config(&[("JAVA_ENABLED", "true"), ("PORT", "http")]).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidPort { ref key, ref value, .. } if key == "PORT" && value == "http"));

		let err = config(&[("BEDROCK_ENABLED", "true"), ("BEDROCK_PORT", "0")]).unwrap_err();
		assert_eq!(err.key(), "BEDROCK_PORT");
		assert!(err.to_string().contains("non-zero"));

		let err = config(&[("BEDROCK_ENABLED", "true"), ("BEDROCK_PORT", "70000")]).unwrap_err();
		assert_eq!(err.key(), "BEDROCK_PORT");
	}

	#[test]
	fn bad_port_of_disabled_edition_is_ignored() {
		assert!(config(&[("PORT", "nope")]).is_ok());
	}

	#[test]
	fn bad_flag_is_fatal() {
		let err = config(&[("JAVA_ENABLED", "sometimes")]).unwrap_err();
		assert_eq!(
			err,
			ConfigError::InvalidBool {
				key: "JAVA_ENABLED".into(),
				value: "sometimes".into(),
			}
		);
	}

	#[test]
	fn bad_duration_is_fatal() {
		let err = config(&[("BEDROCK_SETTLE_SECS", "ten")]).unwrap_err();
		assert_eq!(err.key(), "BEDROCK_SETTLE_SECS");
	}

	#[test]
	fn driver_override_only_touches_enabled_editions() {
		let mut cfg = config(&[("JAVA_ENABLED", "true")]).unwrap();
		cfg.set_driver(Edition::Java, "java-driver".into());
		cfg.set_driver(Edition::Bedrock, "bedrock-driver".into());
		assert_eq!(cfg.java.unwrap().driver.as_deref(), Some("java-driver"));
		assert!(cfg.bedrock.is_none());
	}

	#[test]
	fn summary_matches_connect_params() {
		let java = SessionConfig::defaults(Edition::Java);
		let summary = java.summary();
		assert_eq!(summary["host"], "localhost");
		assert_eq!(summary["port"], 25565);
		assert_eq!(summary["auth"], "microsoft");
		assert_eq!(java.address(), "localhost:25565");

		let bedrock = SessionConfig::defaults(Edition::Bedrock);
		assert!(bedrock.summary().get("auth").is_none());
		assert_eq!(bedrock.connect_params().auth, None);
	}
}
