//! Session client error types.
//!
//! None of these reach the caller of `connect`/`send`/`set_team`/`disconnect`:
//! the session client logs them and keeps going. They exist so the internal
//! fallible steps (configuration, URL building, encoding, opening a socket)
//! can use `?` like everything else.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Endpoint is not a usable `ws://` / `wss://` base URL.
    #[error("Invalid session endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// A configuration value could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidConfig { key: &'static str, value: String },

    /// Outbound payload could not be serialized.
    #[error("Failed to encode outbound payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Underlying WebSocket failure.
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

impl SessionError {
    pub(crate) fn invalid_endpoint(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
