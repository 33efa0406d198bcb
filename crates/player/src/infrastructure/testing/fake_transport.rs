//! In-memory transport.
//!
//! `FakeConnector` hands each opened `FakeLink` to the test, which then plays
//! the server: accept or refuse the connection, push frames, close it, and
//! inspect what the client wrote.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use railbldr_shared::InboundFrame;

use crate::infrastructure::websocket::{CloseInfo, Connector, Link, LinkEvent, LinkRemote, OutboundFrame};

pub struct FakeConnector {
    links: mpsc::UnboundedSender<FakeLink>,
    opens: AtomicUsize,
}

impl FakeConnector {
    /// The connector, plus the receiving end for every link it opens.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeLink>) {
        let (links, opened) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            links,
            opens: AtomicUsize::new(0),
        });
        (connector, opened)
    }

    /// Number of connections opened so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn open(&self, url: &Url) -> Link {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (link, remote) = Link::pair();
        let _ = self.links.send(FakeLink {
            url: url.clone(),
            remote,
        });
        link
    }
}

/// Server side of one fake connection.
pub struct FakeLink {
    url: Url,
    remote: LinkRemote,
}

impl FakeLink {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn accept(&self) {
        self.emit(LinkEvent::Opened);
    }

    /// Fail the handshake: an error followed by a close, without opening.
    pub fn refuse(&self) {
        self.emit(LinkEvent::Error("connection refused".into()));
        self.emit(LinkEvent::Closed(CloseInfo::new(Some(1006), "")));
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.emit(LinkEvent::Frame(InboundFrame::Text(text.into())));
    }

    pub fn push_json(&self, value: &Value) {
        self.push_text(value.to_string());
    }

    pub fn push_binary(&self, bytes: impl Into<Vec<u8>>) {
        self.emit(LinkEvent::Frame(InboundFrame::Binary(bytes.into())));
    }

    pub fn push_error(&self, error: impl Into<String>) {
        self.emit(LinkEvent::Error(error.into()));
    }

    /// Close from the server side.
    pub fn close(&self, code: u16) {
        self.emit(LinkEvent::Closed(CloseInfo::new(Some(code), "")));
    }

    /// True once the client has dropped its end of this connection.
    pub fn is_abandoned(&self) -> bool {
        self.remote.events.is_closed()
    }

    /// Next frame the client wrote, or `None` once it dropped the link.
    pub async fn next_sent(&mut self) -> Option<OutboundFrame> {
        self.remote.outbound.recv().await
    }

    /// Next frame the client wrote, parsed as JSON. `None` for a close frame,
    /// non-JSON text, or a dropped link.
    pub async fn next_sent_json(&mut self) -> Option<Value> {
        match self.next_sent().await? {
            OutboundFrame::Text(text) => serde_json::from_str(&text).ok(),
            OutboundFrame::Close => None,
        }
    }

    /// Frame already written by the client, if any.
    pub fn try_next_sent(&mut self) -> Option<OutboundFrame> {
        self.remote.outbound.try_recv().ok()
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.remote.events.send(event);
    }
}
