//! Desktop WebSocket transport using tokio-tungstenite

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use railbldr_shared::InboundFrame;

use crate::infrastructure::error::SessionError;
use crate::infrastructure::websocket::transport::{
    CloseInfo, Connector, Link, LinkEvent, LinkRemote, OutboundFrame,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens session connections over tokio-tungstenite.
///
/// Each link gets its own pump task that owns the socket. The task must be
/// spawned from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn open(&self, url: &Url) -> Link {
        let (link, remote) = Link::pair();
        let url = url.to_string();
        tokio::spawn(async move {
            pump(url, remote).await;
        });
        link
    }
}

async fn open_stream(url: &str) -> Result<WsStream, SessionError> {
    let (ws_stream, response) = connect_async(url).await?;
    tracing::debug!(%url, status = %response.status(), "WebSocket handshake complete");
    Ok(ws_stream)
}

async fn pump(url: String, remote: LinkRemote) {
    let LinkRemote {
        mut outbound,
        events,
    } = remote;

    let ws_stream = match open_stream(&url).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(%url, error = %e, "Failed to open WebSocket");
            let _ = events.send(LinkEvent::Error(e.to_string()));
            let _ = events.send(LinkEvent::Closed(CloseInfo::new(None, e.to_string())));
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    if events.send(LinkEvent::Opened).is_err() {
        // Abandoned while the handshake was in flight
        let _ = write.send(Message::Close(None)).await;
        return;
    }

    let close = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        tracing::error!(%url, error = %e, "Failed to send message");
                        let _ = events.send(LinkEvent::Error(e.to_string()));
                        break CloseInfo::new(None, e.to_string());
                    }
                }
                Some(OutboundFrame::Close) | None => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        tracing::debug!(%url, error = %e, "Close frame not delivered");
                    }
                    break CloseInfo::new(Some(1000), "closed by client");
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(LinkEvent::Frame(InboundFrame::Text(text)));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let _ = events.send(LinkEvent::Frame(InboundFrame::Binary(bytes)));
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(%url, "Server closed connection");
                    break close_info(frame);
                }
                // Control frames are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!(%url, error = %e, "WebSocket error");
                    let _ = events.send(LinkEvent::Error(e.to_string()));
                    break CloseInfo::new(None, e.to_string());
                }
                None => break CloseInfo::new(None, "stream ended"),
            },
        }
    };

    let _ = events.send(LinkEvent::Closed(close));
}

fn close_info(frame: Option<CloseFrame<'_>>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo::new(Some(u16::from(frame.code)), frame.reason.into_owned()),
        None => CloseInfo::new(None, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn next(link: &mut Link) -> LinkEvent {
        timeout(WAIT, link.next_event())
            .await
            .expect("timed out waiting for link event")
            .expect("link ended")
    }

    /// Accepts one client; answers `ping` with a pong wrapped in noise and
    /// echoes everything else back as binary.
    async fn spawn_game_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                match msg {
                    Message::Text(text) if text.contains("\"ping\"") => {
                        ws.send(Message::Text(r#"srv:{"action":"pong"}"#.into()))
                            .await
                            .unwrap();
                    }
                    Message::Text(text) => {
                        ws.send(Message::Binary(text.into_bytes())).await.unwrap();
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        Url::parse(&format!("ws://{addr}/game/ROOM1")).unwrap()
    }

    #[tokio::test]
    async fn test_open_send_and_receive() {
        let url = spawn_game_server().await;
        let mut link = TungsteniteConnector.open(&url);

        assert_eq!(next(&mut link).await, LinkEvent::Opened);

        assert!(link.send_text(r#"{"action":"ping"}"#.into()));
        match next(&mut link).await {
            LinkEvent::Frame(frame) => {
                assert_eq!(frame.decode(), Some(serde_json::json!({ "action": "pong" })));
            }
            other => panic!("expected frame, got {other:?}"),
        }

        assert!(link.send_text(r#"{"action":"end_turn"}"#.into()));
        assert_eq!(
            next(&mut link).await,
            LinkEvent::Frame(InboundFrame::Binary(br#"{"action":"end_turn"}"#.to_vec()))
        );
    }

    #[tokio::test]
    async fn test_client_close_reports_closed() {
        let url = spawn_game_server().await;
        let mut link = TungsteniteConnector.open(&url);
        assert_eq!(next(&mut link).await, LinkEvent::Opened);

        link.close();
        match next(&mut link).await {
            LinkEvent::Closed(info) => assert_eq!(info.code, Some(1000)),
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{addr}/game/GONE")).unwrap();
        let mut link = TungsteniteConnector.open(&url);

        assert!(matches!(next(&mut link).await, LinkEvent::Error(_)));
        assert!(matches!(next(&mut link).await, LinkEvent::Closed(_)));
        assert_eq!(timeout(WAIT, link.next_event()).await.unwrap(), None);
    }
}
