pub mod error;
pub mod messaging;
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::SessionError;
pub use messaging::{ConnectionState, ConnectionStateObserver};
