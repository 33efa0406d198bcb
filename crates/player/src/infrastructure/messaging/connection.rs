//! Connection state shared between the session driver and its observers.
//!
//! The driver writes through a `StateCell`; callers only ever get the
//! read-only `ConnectionStateObserver` view of the same cell.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    /// Never connected, deliberately disconnected, or closed without retry
    #[default]
    Disconnected = 0,
    /// Opening a fresh connection after `connect()`
    Connecting = 1,
    /// Open, heartbeat running
    Connected = 2,
    /// Lost; a retry is scheduled or opening
    Reconnecting = 3,
    /// Retries exhausted
    Failed = 4,
}

impl ConnectionState {
    const BY_REPR: [ConnectionState; 5] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Reconnecting,
        ConnectionState::Failed,
    ];

    fn from_repr(raw: u8) -> Self {
        Self::BY_REPR
            .get(usize::from(raw))
            .copied()
            .unwrap_or_default()
    }
}

/// Single-writer cell holding the current `ConnectionState`.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn get(&self) -> ConnectionState {
        ConnectionState::from_repr(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver { cell: self.clone() }
    }
}

/// Read-only view of a session's connection state, for UI bindings and
/// status displays. Clones observe the same session.
#[derive(Debug, Clone)]
pub struct ConnectionStateObserver {
    cell: StateCell,
}

impl ConnectionStateObserver {
    pub fn state(&self) -> ConnectionState {
        self.cell.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_round_trips_every_state() {
        for state in ConnectionState::BY_REPR {
            assert_eq!(ConnectionState::from_repr(state as u8), state);
        }
        assert_eq!(ConnectionState::from_repr(200), ConnectionState::Disconnected);
    }

    #[test]
    fn test_observer_sees_driver_writes() {
        let cell = StateCell::default();
        let observer = cell.observer();

        assert_eq!(observer.state(), ConnectionState::Disconnected);
        assert!(!observer.is_connected());

        cell.set(ConnectionState::Connected);
        assert!(observer.is_connected());

        cell.set(ConnectionState::Reconnecting);
        assert_eq!(observer.clone().state(), ConnectionState::Reconnecting);
        assert!(!observer.is_connected());
    }
}
