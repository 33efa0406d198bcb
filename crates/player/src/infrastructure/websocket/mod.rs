//! WebSocket session client for the game server
//!
//! - `client`: the caller-facing `SessionClient` handle
//! - `session`: the driver task that owns connection state
//! - `transport`: the `Connector` seam between driver and socket
//! - `desktop`: tokio-tungstenite based connector

mod client;
mod core;
mod desktop;
mod session;
pub(crate) mod shared;
mod transport;


pub use client::{SessionClient, SessionHandlers, WeakSessionClient};
pub use desktop::TungsteniteConnector;
pub use transport::{CloseInfo, Connector, Link, LinkEvent, LinkRemote, OutboundFrame};
