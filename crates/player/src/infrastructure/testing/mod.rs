//! Test doubles for driving a `SessionClient` without a network.

mod fake_transport;

pub use fake_transport::{FakeConnector, FakeLink};
