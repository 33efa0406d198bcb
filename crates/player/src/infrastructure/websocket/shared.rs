//! Shared constants for the session client.
//!
//! Runtime-agnostic (no tokio, no sockets) so the pure state pieces in `core`
//! and the configuration defaults stay in sync.

use std::time::Duration;

// Heartbeat
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

// Reconnection
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const BACKOFF_MULTIPLIER: u32 = 2;
