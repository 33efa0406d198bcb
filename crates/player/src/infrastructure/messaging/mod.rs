//! Connection lifecycle observation shared between the session driver and its callers.

pub mod connection;

pub(crate) use connection::StateCell;
pub use connection::{ConnectionState, ConnectionStateObserver};
