//! afk runtime - driver discovery, process lifecycle, and transports
//!
//! The bot never speaks a game protocol itself. Each edition's protocol
//! library runs inside a *driver* (a child process or a WebSocket endpoint)
//! and this crate provides everything needed to reach one:
//!
//! - **Driver discovery**: Resolving an edition's driver endpoint
//! - **Process management**: Spawning and reaping driver processes
//! - **Transport**: Length-prefixed JSON over stdio pipes, or JSON text frames
//!   over WebSocket
//! - **Connection**: The [`Connector`] / [`Link`] seam sessions are written
//!   against, with [`DriverConnector`] as the production implementation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   afk-core   │  Sessions, supervisor
//! └──────┬───────┘
//!        │ Connector / Link
//! ┌──────▼───────┐
//! │  afk-runtime │  This crate
//! │  ┌────────┐  │
//! │  │ Conn   │  │  connect command, event decoding
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Pipe/WebSocket transport
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Driver │  │  Discovery + process management
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod connection;
pub mod driver;
pub mod error;
pub mod process;
pub mod transport;

pub use connection::{ConnectRequest, Connector, DriverConnector, DriverLink, EventStream, Handle, Link};
pub use driver::{DriverEndpoint, locate_driver};
pub use error::{Error, Result};
pub use process::DriverProcess;
pub use transport::{
	PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts, TransportReceiver,
	WebSocketTransport, WebSocketTransportReceiver, WebSocketTransportSender,
};
