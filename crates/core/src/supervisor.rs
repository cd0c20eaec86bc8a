//! Session ownership and chat routing.

use std::collections::BTreeMap;
use std::sync::Arc;

use afk_protocol::Edition;
use afk_runtime::Connector;
use tracing::info;

use crate::config::BotConfig;
use crate::error::RouteError;
use crate::session::{LifecycleState, ProtocolSession, SessionHandle, StartGate};

/// Owns every session and routes operator chat to them.
///
/// Java starts first. When both editions are enabled, Bedrock's first attempt
/// waits until Java has logged in once, plus a settle delay, so the two
/// logins do not race each other on the account service.
#[derive(Debug, Default)]
pub struct ConnectionSupervisor {
	sessions: BTreeMap<Edition, SessionHandle>,
}

impl ConnectionSupervisor {
	/// Spawns a session for every enabled edition.
	///
	/// Must be called from within a tokio runtime.
	pub fn start(config: &BotConfig, connector: Arc<dyn Connector>) -> Self {
		let mut sessions = BTreeMap::new();

		let java = config.java.clone().map(|java| {
			info!(target = "afk", config = %java.summary(), "{} Starting with the following configuration", Edition::Java.tag());
			ProtocolSession::spawn(java, Arc::clone(&connector), StartGate::Open)
		});
		if java.is_none() {
			info!(target = "afk", "{} Disabled in configuration", Edition::Java.tag());
		}

		match config.bedrock.clone() {
			Some(bedrock) => {
				info!(target = "afk", config = %bedrock.summary(), "{} Starting with the following configuration", Edition::Bedrock.tag());
				let gate = match &java {
					Some(java) => StartGate::AfterConnected {
						leader: java.logins(),
						settle: config.settle_delay,
					},
					None => StartGate::Open,
				};
				sessions.insert(Edition::Bedrock, ProtocolSession::spawn(bedrock, connector, gate));
			}
			None => info!(target = "afk", "{} Disabled in configuration", Edition::Bedrock.tag()),
		}

		if let Some(java) = java {
			sessions.insert(Edition::Java, java);
		}

		Self { sessions }
	}

	/// Editions with a session, in startup order.
	pub fn editions(&self) -> Vec<Edition> {
		self.sessions.keys().copied().collect()
	}

	pub fn session(&self, edition: Edition) -> Option<&SessionHandle> {
		self.sessions.get(&edition)
	}

	/// Lifecycle state of `edition`'s session, `None` when disabled.
	pub fn state(&self, edition: Edition) -> Option<LifecycleState> {
		self.session(edition).map(SessionHandle::state)
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}

	/// Sends `text` through the session for `edition`.
	///
	/// Without an explicit edition Java is preferred whenever it exists, even
	/// if it is not currently connected. Returns the edition that carried the
	/// line.
	pub async fn route(&self, edition: Option<Edition>, text: &str) -> Result<Edition, RouteError> {
		let target = match edition {
			Some(edition) => {
				if !self.sessions.contains_key(&edition) {
					return Err(RouteError::Disabled(edition));
				}
				edition
			}
			None => self.default_target().ok_or(RouteError::NoSession)?,
		};

		let Some(session) = self.sessions.get(&target) else {
			return Err(RouteError::Disabled(target));
		};
		session
			.send_chat(text)
			.await
			.map(|()| target)
			.map_err(|source| RouteError::Send { edition: target, source })
	}

	fn default_target(&self) -> Option<Edition> {
		Edition::ALL.into_iter().find(|edition| self.sessions.contains_key(edition))
	}

	/// Stops every session and releases its link. Safe to call repeatedly.
	pub async fn stop_all(&mut self) {
		if self.sessions.values().all(SessionHandle::is_stopped) {
			return;
		}

		info!(target = "afk", "Disconnecting bots...");
		for session in self.sessions.values_mut().rev() {
			session.stop().await;
		}
	}
}
