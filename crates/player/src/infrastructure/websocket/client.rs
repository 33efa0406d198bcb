//! Caller-facing session handle.
//!
//! `SessionClient` is cheap to clone; every clone drives the same session.
//! Calls never block and never fail: they enqueue a command for the session
//! driver, which applies them in order.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use railbldr_shared::{ClientMessage, StateRequest, Team};

use super::desktop::TungsteniteConnector;
use super::session::{Command, SessionDriver};
use super::transport::Connector;
use crate::config::SessionConfig;
use crate::infrastructure::error::SessionError;
use crate::infrastructure::messaging::{ConnectionState, ConnectionStateObserver, StateCell};

type MessageHandler = Box<dyn Fn(Value) + Send + Sync>;
type LifecycleHandler = Box<dyn Fn() + Send + Sync>;

/// Callbacks for one session. Each `connect()` replaces the whole set.
///
/// Callbacks run on the session driver task and should return quickly.
/// A callback that needs to act on the session must capture a
/// `WeakSessionClient` (from `SessionClient::downgrade`), never a
/// `SessionClient`: a strong handle stored in a callback keeps the session
/// alive after every outside handle is gone.
#[derive(Default)]
pub struct SessionHandlers {
    on_message: Option<MessageHandler>,
    on_open: Option<LifecycleHandler>,
    on_close: Option<LifecycleHandler>,
}

impl SessionHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every decoded server payload except heartbeat pongs.
    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.on_message = Some(Box::new(handler));
        self
    }

    /// Each time a connection opens, fresh or reconnected.
    pub fn on_open<F>(mut self, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_open = Some(Box::new(handler));
        self
    }

    /// When the session closes for good: a close without retry, or
    /// reconnect attempts exhausted. Not called for `disconnect()`.
    pub fn on_close<F>(mut self, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_close = Some(Box::new(handler));
        self
    }

    pub(crate) fn emit_message(&self, payload: Value) {
        if let Some(handler) = &self.on_message {
            handler(payload);
        }
    }

    pub(crate) fn emit_open(&self) {
        if let Some(handler) = &self.on_open {
            handler();
        }
    }

    pub(crate) fn emit_close(&self) {
        if let Some(handler) = &self.on_close {
            handler();
        }
    }
}

impl fmt::Debug for SessionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandlers")
            .field("on_message", &self.on_message.is_some())
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

/// Reconnecting WebSocket client for one game session at a time.
///
/// Must be created inside a Tokio runtime. The session is torn down when the
/// last clone is dropped.
#[derive(Clone)]
pub struct SessionClient {
    commands: mpsc::UnboundedSender<Command>,
    state: ConnectionStateObserver,
}

impl SessionClient {
    /// Client using the tokio-tungstenite transport.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector))
    }

    /// Client using a caller-supplied transport.
    pub fn with_connector(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let state = StateCell::default();

        let driver = SessionDriver::new(config, connector, receiver, state.clone());
        tokio::spawn(driver.run());

        Self {
            commands,
            state: state.observer(),
        }
    }

    /// Handle that does not keep the session alive, for use inside callbacks.
    pub fn downgrade(&self) -> WeakSessionClient {
        WeakSessionClient {
            commands: self.commands.downgrade(),
            state: self.state.clone(),
        }
    }

    /// Join `room_id`, replacing any callbacks from an earlier `connect()`.
    ///
    /// A no-op (apart from the callback swap) when already connected to the
    /// same room; any other connection is closed first.
    pub fn connect(&self, room_id: impl Into<String>, handlers: SessionHandlers) {
        self.dispatch(Command::Connect {
            room_id: room_id.into(),
            handlers,
        });
    }

    /// Serialize `payload` to JSON and send it if the connection is open.
    /// Dropped with a warning otherwise; nothing is queued.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) {
        match serde_json::to_string(payload) {
            Ok(text) => self.dispatch(Command::Send(text)),
            Err(e) => tracing::error!(error = %SessionError::from(e), "Dropping outbound payload"),
        }
    }

    /// Remember the team to replay after a reconnect.
    pub fn set_team(&self, team: impl Into<String>) {
        self.dispatch(Command::SetTeam(team.into()));
    }

    /// Send the reconnect announcement now. A non-empty `team` also replaces
    /// the remembered one.
    pub fn announce_reconnect(&self, team: Option<String>) {
        self.dispatch(Command::AnnounceReconnect(team));
    }

    /// Close the connection and cancel any pending reconnect. Idempotent.
    pub fn disconnect(&self) {
        self.dispatch(Command::Disconnect);
    }

    pub fn state(&self) -> ConnectionState {
        self.state.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn state_observer(&self) -> ConnectionStateObserver {
        self.state.clone()
    }

    // =========================================================================
    // Game actions
    // =========================================================================

    pub fn join_team(&self, team: Team) {
        self.send(&ClientMessage::Join { team });
    }

    pub fn start_game(&self) {
        self.send(&ClientMessage::Start);
    }

    pub fn submit_bid(&self, biddable: impl Into<String>, bid: u64) {
        self.send(&ClientMessage::Bid {
            biddable: biddable.into(),
            bid,
        });
    }

    pub fn build_station(&self, line: impl Into<String>, id: impl Into<String>) {
        self.send(&ClientMessage::Build {
            line: line.into(),
            id: id.into(),
        });
    }

    pub fn end_turn(&self) {
        self.send(&ClientMessage::EndTurn);
    }

    /// Ask the server to resend the full game state.
    pub fn request_state(&self) {
        self.send(&StateRequest {});
    }

    fn dispatch(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Session driver has stopped, command dropped");
        }
    }
}

/// Non-owning `SessionClient` handle.
///
/// Once the last `SessionClient` is dropped the session is torn down and
/// `upgrade` returns `None`.
#[derive(Clone)]
pub struct WeakSessionClient {
    commands: mpsc::WeakUnboundedSender<Command>,
    state: ConnectionStateObserver,
}

impl WeakSessionClient {
    pub fn upgrade(&self) -> Option<SessionClient> {
        let commands = self.commands.upgrade()?;
        Some(SessionClient {
            commands,
            state: self.state.clone(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state.state()
    }
}
