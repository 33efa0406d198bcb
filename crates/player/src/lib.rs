//! RailBldr Player session client.
//!
//! Keeps one reconnecting WebSocket session to a game room alive: heartbeat
//! liveness checks, exponential-backoff reconnects, and identity replay after
//! a reconnect. Server payloads are decoded leniently and handed to caller
//! callbacks.

pub mod config;
pub mod infrastructure;

pub use config::SessionConfig;
pub use infrastructure::websocket::{
    Connector, SessionClient, SessionHandlers, TungsteniteConnector, WeakSessionClient,
};
pub use infrastructure::{ConnectionState, ConnectionStateObserver, SessionError};
