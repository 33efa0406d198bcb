//! RailBldr Protocol - Shared types for game server and Player communication
//!
//! This crate contains the wire vocabulary exchanged over a game session connection:
//! - Outbound action payloads (`ClientMessage`, `StateRequest`)
//! - Inbound frame decoding (`InboundFrame`, `decode_text`)
//! - Heartbeat reply detection (`is_pong`)
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json and a small regex engine
//! 2. **No game rules** - Inbound payloads stay opaque `serde_json::Value`s
//! 3. **Runtime agnostic** - No tokio, no sockets

pub mod frame;
pub mod messages;

pub use frame::{decode_text, is_pong, InboundFrame};
pub use messages::{ClientMessage, StateRequest, Team, UnknownTeam};
