//! Wire types shared between the bot and its protocol drivers.
//!
//! A driver hosts one edition's protocol library and speaks a small JSON
//! bridge protocol with the bot:
//!
//! - [`DriverCommand`] - Messages from the bot to a driver
//! - [`Envelope`] / [`DriverEvent`] - Messages from a driver to the bot
//! - [`Edition`] - Which game edition a session or driver serves
//! - [`ReasonSummary`] - Human-readable digest of kick/disconnect reasons

pub mod bridge;
pub mod edition;
pub mod reason;

pub use bridge::{
	ChatMessage, ConnectParams, DriverCommand, DriverError, DriverEvent, Envelope, Handshake, Kick,
	NestedError, ReasonParams, TextMessage,
};
pub use edition::{Edition, ParseEditionError};
pub use reason::{ChatComponent, ReasonSummary};
