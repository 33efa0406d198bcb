//! Transport seam between the session driver and a concrete WebSocket.
//!
//! Opening a connection never blocks: `Connector::open` hands back a `Link`
//! immediately, and the outcome (open, frames, errors, close) arrives later as
//! `LinkEvent`s, in order. A link whose event channel ends is closed.

use tokio::sync::mpsc;
use url::Url;

use railbldr_shared::InboundFrame;

/// Opens connections to session endpoints.
#[cfg_attr(test, mockall::automock)]
pub trait Connector: Send + Sync {
    fn open(&self, url: &Url) -> Link;
}

/// Why a connection closed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseInfo {
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Events reported by the transport for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Frame(InboundFrame),
    /// Transport-level error; informational, the close event follows
    Error(String),
    Closed(CloseInfo),
}

/// Frames written by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

/// Driver-side end of one connection.
///
/// Dropping it abandons the connection: the transport sees its outbound
/// channel close and shuts the socket down.
#[derive(Debug)]
pub struct Link {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    events: mpsc::UnboundedReceiver<LinkEvent>,
}

/// Transport-side end of one connection.
#[derive(Debug)]
pub struct LinkRemote {
    pub outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
}

impl Link {
    /// Create both ends of a connection.
    pub fn pair() -> (Link, LinkRemote) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Link {
                outbound: outbound_tx,
                events: events_rx,
            },
            LinkRemote {
                outbound: outbound_rx,
                events: events_tx,
            },
        )
    }

    /// Queue a text frame. Returns false if the transport is gone.
    pub fn send_text(&self, text: String) -> bool {
        self.outbound.send(OutboundFrame::Text(text)).is_ok()
    }

    /// Ask the transport to close the socket.
    pub fn close(&self) {
        let _ = self.outbound.send(OutboundFrame::Close);
    }

    /// Next event, or `None` once the transport has gone away.
    pub async fn next_event(&mut self) -> Option<LinkEvent> {
        self.events.recv().await
    }
}
