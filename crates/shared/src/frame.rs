//! Inbound frame decoding.
//!
//! Servers are not always careful about what they put on the wire: frames may
//! arrive as binary, or wrap the JSON payload in extra text. Decoding is
//! lenient and never fails loudly; an undecodable frame is simply `None`.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;

/// Greedy match from the first `{` to the last `}`.
static BRACED_PAYLOAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("literal pattern compiles"));

/// A raw frame as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl InboundFrame {
    /// Decode the frame into a JSON payload.
    ///
    /// Binary frames are read as UTF-8 (invalid sequences replaced) and then
    /// decoded like text.
    pub fn decode(&self) -> Option<Value> {
        match self {
            InboundFrame::Text(text) => decode_text(text),
            InboundFrame::Binary(bytes) => decode_text(&String::from_utf8_lossy(bytes)),
        }
    }
}

/// Parse a text frame as JSON, falling back to the largest brace-delimited
/// substring. A literal `null` counts as undecodable.
pub fn decode_text(text: &str) -> Option<Value> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => {
            let braced = BRACED_PAYLOAD.find(text)?;
            serde_json::from_str::<Value>(braced.as_str()).ok()?
        }
    };

    if value.is_null() {
        None
    } else {
        Some(value)
    }
}

/// Whether a decoded payload is a heartbeat reply.
pub fn is_pong(payload: &Value) -> bool {
    ["action", "type"]
        .iter()
        .any(|key| payload.get(key).and_then(Value::as_str) == Some("pong"))
}
