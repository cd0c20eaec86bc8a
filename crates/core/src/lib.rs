//! afk - connection lifecycle and reconnection supervisor for a dual-edition
//! AFK bot.
//!
//! The bot keeps a presence on a game server over up to two protocol
//! editions at once and relays operator chat into whichever is live:
//!
//! - [`BotConfig`] / [`SessionConfig`]: configuration resolved from the
//!   environment
//! - [`ProtocolSession`]: one edition's connect, keep-alive and reconnect loop,
//!   driven by an [`EditionProfile`]
//! - [`ConnectionSupervisor`]: owns the sessions, staggers their startup and
//!   routes chat
//! - [`Failure`]: how connections end, with operator hints
//!
//! Game protocols are spoken by out-of-process drivers reached through
//! [`afk_runtime`]; sessions only see the [`Connector`] / [`Link`] seam, which
//! [`testing`] provides doubles for.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use afk::{BotConfig, ConnectionSupervisor};
//! use afk_runtime::DriverConnector;
//!
//! let config = BotConfig::from_env()?;
//! let mut supervisor = ConnectionSupervisor::start(&config, Arc::new(DriverConnector::new()));
//! supervisor.route(None, "hello").await?;
//! supervisor.stop_all().await;
//! ```

pub mod config;
pub mod error;
pub mod failure;
pub mod profile;
pub mod session;
pub mod supervisor;
pub mod testing;

pub use afk_protocol::Edition;
pub use afk_runtime::{Connector, Link};
pub use config::{BotConfig, SessionConfig};
pub use error::{ConfigError, RouteError, SendError};
pub use failure::Failure;
pub use profile::EditionProfile;
pub use session::{LifecycleState, ProtocolSession, SessionHandle, StartGate};
pub use supervisor::ConnectionSupervisor;
