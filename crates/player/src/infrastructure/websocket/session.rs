//! Session driver - the single task that owns a session's connection state.
//!
//! Every mutation of the connection handle, room/team identity, callbacks,
//! reconnect policy and heartbeat deadlines happens here, one event at a
//! time. Callers talk to it through `Command`s; the transport talks to it
//! through `LinkEvent`s; timers are deadlines awaited in the same loop.
//!
//! ```text
//! IDLE ──connect──▶ CONNECTING ──opened──▶ OPEN ──disconnect──▶ IDLE
//!                                           │
//!                                 close / heartbeat miss
//!                                           ▼
//!                 OPEN ◀──opened── RECONNECTING ──5 failures──▶ GIVEN_UP (idle)
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use railbldr_shared::{is_pong, ClientMessage, InboundFrame};

use super::client::SessionHandlers;
use super::core::{BackoffState, Heartbeat};
use super::transport::{CloseInfo, Connector, Link, LinkEvent};
use crate::config::SessionConfig;
use crate::infrastructure::messaging::{ConnectionState, StateCell};

/// Requests from `SessionClient` handles.
pub(crate) enum Command {
    Connect {
        room_id: String,
        handlers: SessionHandlers,
    },
    Send(String),
    SetTeam(String),
    AnnounceReconnect(Option<String>),
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    /// Opened by `connect()`
    Fresh,
    /// Opened by a scheduled reconnect attempt; replays identity once open
    Reconnect,
}

struct ActiveLink {
    link: Link,
    kind: LinkKind,
    open: bool,
}

#[derive(Debug, Default)]
struct SessionIdentity {
    room_id: Option<String>,
    team: Option<String>,
}

pub(crate) struct SessionDriver {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<Command>,
    state: StateCell,
    handlers: SessionHandlers,
    link: Option<ActiveLink>,
    identity: SessionIdentity,
    should_reconnect: bool,
    backoff: BackoffState,
    reconnect_at: Option<Instant>,
    heartbeat: Heartbeat,
}

impl SessionDriver {
    pub(crate) fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        commands: mpsc::UnboundedReceiver<Command>,
        state: StateCell,
    ) -> Self {
        let backoff =
            BackoffState::new(config.reconnect_base_delay(), config.max_reconnect_attempts());
        let heartbeat = Heartbeat::new(config.heartbeat_interval(), config.heartbeat_timeout());
        Self {
            config,
            connector,
            commands,
            state,
            handlers: SessionHandlers::default(),
            link: None,
            identity: SessionIdentity::default(),
            should_reconnect: false,
            backoff,
            reconnect_at: None,
            heartbeat,
        }
    }

    /// Run until every `SessionClient` handle is dropped, then tear down.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("All session client handles dropped, stopping driver");
                        self.disconnect();
                        break;
                    }
                },
                event = next_link_event(&mut self.link) => self.handle_link_event(event),
                _ = wait_for(self.reconnect_at) => self.fire_reconnect(),
                _ = wait_for(self.heartbeat.next_probe()) => self.send_probe(),
                _ = wait_for(self.heartbeat.timeout_deadline()) => self.check_liveness(),
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { room_id, handlers } => self.connect(room_id, handlers),
            Command::Send(text) => self.transmit(text),
            Command::SetTeam(team) => {
                tracing::debug!(%team, "Recorded team for reconnect replay");
                self.identity.team = Some(team);
            }
            Command::AnnounceReconnect(team) => {
                if let Some(team) = team.filter(|t| !t.is_empty()) {
                    self.identity.team = Some(team);
                }
                self.announce_reconnect();
            }
            Command::Disconnect => self.disconnect(),
        }
    }

    fn handle_link_event(&mut self, event: Option<LinkEvent>) {
        match event {
            Some(LinkEvent::Opened) => self.handle_open(),
            Some(LinkEvent::Frame(frame)) => self.handle_frame(frame),
            // The close event that follows drives any state change
            Some(LinkEvent::Error(error)) => tracing::error!(%error, "WebSocket error"),
            Some(LinkEvent::Closed(info)) => self.handle_close(info),
            None => self.handle_close(CloseInfo::new(None, "transport ended")),
        }
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    fn connect(&mut self, room_id: String, handlers: SessionHandlers) {
        self.handlers = handlers;
        self.should_reconnect = true;
        self.backoff.reset();
        self.reconnect_at = None;

        let already_open = self.link.as_ref().is_some_and(|active| active.open)
            && self.identity.room_id.as_deref() == Some(room_id.as_str());
        if already_open {
            tracing::info!(room = %room_id, "WebSocket already connected");
            return;
        }

        if let Some(previous) = self.link.take() {
            tracing::info!(
                previous = ?self.identity.room_id,
                room = %room_id,
                "Closing previous session connection"
            );
            previous.link.close();
            self.heartbeat.stop();
            self.identity.room_id = None;
        }

        self.identity.room_id = Some(room_id);
        self.open_link(LinkKind::Fresh);
    }

    fn open_link(&mut self, kind: LinkKind) {
        self.heartbeat.stop();
        if let Some(stale) = self.link.take() {
            stale.link.close();
        }

        let Some(room_id) = self.identity.room_id.clone() else {
            return;
        };

        match self.config.endpoint_for(&room_id) {
            Ok(url) => {
                tracing::info!(%url, ?kind, "Opening session connection");
                let link = self.connector.open(&url);
                self.link = Some(ActiveLink {
                    link,
                    kind,
                    open: false,
                });
                self.set_state(match kind {
                    LinkKind::Fresh => ConnectionState::Connecting,
                    LinkKind::Reconnect => ConnectionState::Reconnecting,
                });
            }
            Err(e) => {
                tracing::error!(room = %room_id, error = %e, "Cannot build session URL");
                self.handle_close(CloseInfo::new(None, e.to_string()));
            }
        }
    }

    fn handle_open(&mut self) {
        let Some(active) = self.link.as_mut() else {
            return;
        };
        active.open = true;
        let kind = active.kind;

        self.backoff.reset();
        self.heartbeat.start(Instant::now());
        self.set_state(ConnectionState::Connected);

        match kind {
            LinkKind::Fresh => {
                tracing::info!(room = ?self.identity.room_id, "WebSocket connected");
            }
            LinkKind::Reconnect => {
                tracing::info!(room = ?self.identity.room_id, "WebSocket reconnected");
                self.announce_reconnect();
            }
        }

        self.handlers.emit_open();
    }

    fn handle_frame(&mut self, frame: InboundFrame) {
        tracing::debug!(?frame, "WS raw message");

        let Some(payload) = frame.decode() else {
            tracing::debug!("WS message: could not parse payload, skipping");
            return;
        };

        if self.heartbeat.is_running() {
            self.heartbeat.record_activity(Instant::now());
        }

        if is_pong(&payload) {
            tracing::debug!("Received heartbeat pong");
            return;
        }

        self.handlers.emit_message(payload);
    }

    fn handle_close(&mut self, info: CloseInfo) {
        tracing::warn!(
            code = ?info.code,
            reason = %info.reason,
            room = ?self.identity.room_id,
            "WebSocket closed"
        );
        self.heartbeat.stop();
        self.link = None;

        if self.should_reconnect && self.identity.room_id.is_some() {
            tracing::info!("Connection lost, attempting to reconnect");
            self.schedule_reconnect();
        } else {
            self.identity.room_id = None;
            self.set_state(ConnectionState::Disconnected);
            self.handlers.emit_close();
        }
    }

    fn disconnect(&mut self) {
        self.should_reconnect = false;
        self.heartbeat.stop();
        self.reconnect_at = None;
        if let Some(active) = self.link.take() {
            tracing::info!(room = ?self.identity.room_id, "Disconnecting session");
            active.link.close();
        }
        self.identity.room_id = None;
        self.backoff.reset();
        self.set_state(ConnectionState::Disconnected);
    }

    // =========================================================================
    // Reconnection
    // =========================================================================

    fn schedule_reconnect(&mut self) {
        let Some(delay) = self.backoff.next_delay_and_advance() else {
            tracing::error!(
                attempts = self.backoff.max_attempts(),
                "Failed to reconnect, giving up"
            );
            self.give_up();
            return;
        };

        let Some(due) = Instant::now().checked_add(delay) else {
            tracing::error!(
                attempt = self.backoff.attempts(),
                delay = ?delay,
                "Reconnect delay out of range, giving up"
            );
            self.give_up();
            return;
        };

        tracing::info!(
            attempt = self.backoff.attempts(),
            max_attempts = self.backoff.max_attempts(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Scheduling reconnect"
        );
        self.reconnect_at = Some(due);
        self.set_state(ConnectionState::Reconnecting);
    }

    fn give_up(&mut self) {
        self.should_reconnect = false;
        self.backoff.reset();
        self.reconnect_at = None;
        self.identity.room_id = None;
        self.set_state(ConnectionState::Failed);
        self.handlers.emit_close();
    }

    fn fire_reconnect(&mut self) {
        self.reconnect_at = None;
        if !self.should_reconnect {
            return;
        }
        self.open_link(LinkKind::Reconnect);
    }

    fn announce_reconnect(&mut self) {
        let team = self.identity.team.as_deref();
        tracing::info!(team = ?team, "Sending reconnect announcement");
        self.send_message(&ClientMessage::reconnect(team));
    }

    // =========================================================================
    // Heartbeat
    // =========================================================================

    fn send_probe(&mut self) {
        self.heartbeat.probe_sent(Instant::now());
        self.send_message(&ClientMessage::Ping);
    }

    fn check_liveness(&mut self) {
        if !self.heartbeat.timeout_elapsed(Instant::now()) {
            return;
        }

        tracing::warn!(room = ?self.identity.room_id, "WebSocket heartbeat missed, closing socket");
        if let Some(active) = self.link.take() {
            active.link.close();
        }
        self.handle_close(CloseInfo::new(None, "heartbeat timeout"));
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    fn send_message(&mut self, message: &ClientMessage) {
        match serde_json::to_string(message) {
            Ok(text) => self.transmit(text),
            Err(e) => tracing::error!(error = %e, "Failed to serialize outbound message"),
        }
    }

    /// At-most-once: frames are dropped unless the connection is open.
    fn transmit(&mut self, text: String) {
        match self.link.as_ref() {
            Some(active) if active.open => {
                tracing::debug!(payload = %text, "WS send");
                if !active.link.send_text(text) {
                    tracing::warn!("Transport already gone, outbound frame dropped");
                }
            }
            _ => tracing::warn!(payload = %text, "WebSocket not open, cannot send"),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.set(state);
    }
}

async fn next_link_event(link: &mut Option<ActiveLink>) -> Option<LinkEvent> {
    match link {
        Some(active) => active.link.next_event().await,
        None => std::future::pending().await,
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
