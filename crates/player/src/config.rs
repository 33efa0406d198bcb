//! Session client configuration.
//!
//! Defaults match the game server's expectations; every knob can be
//! overridden from the environment (a `.env` file is honored by the runner).

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::infrastructure::error::SessionError;
use crate::infrastructure::websocket::shared::{
    HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT, MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY,
};

pub const DEFAULT_SESSION_URL: &str = "ws://localhost:8080/game";

pub const ENV_SESSION_URL: &str = "RAILBLDR_SESSION_URL";
pub const ENV_HEARTBEAT_INTERVAL_SECS: &str = "RAILBLDR_HEARTBEAT_INTERVAL_SECS";
pub const ENV_HEARTBEAT_TIMEOUT_SECS: &str = "RAILBLDR_HEARTBEAT_TIMEOUT_SECS";
pub const ENV_RECONNECT_BASE_DELAY_MS: &str = "RAILBLDR_RECONNECT_BASE_DELAY_MS";
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "RAILBLDR_MAX_RECONNECT_ATTEMPTS";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base endpoint; the room id is appended as the last path segment.
    endpoint: Url,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    /// Delay before the first reconnect attempt, doubled for each following one.
    reconnect_base_delay: Duration,
    max_reconnect_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_SESSION_URL).expect("default endpoint is a valid URL"),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            heartbeat_timeout: HEARTBEAT_TIMEOUT,
            reconnect_base_delay: RECONNECT_BASE_DELAY,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl SessionConfig {
    /// Default timings against a custom endpoint.
    pub fn new(endpoint: &str) -> Result<Self, SessionError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            ..Self::default()
        })
    }

    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup. Missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_SESSION_URL) {
            Some(url) => Self::new(&url)?,
            None => Self::default(),
        };

        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_HEARTBEAT_INTERVAL_SECS)? {
            config.heartbeat_interval =
                non_zero(ENV_HEARTBEAT_INTERVAL_SECS, Duration::from_secs(secs))?;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_HEARTBEAT_TIMEOUT_SECS)? {
            config.heartbeat_timeout =
                non_zero(ENV_HEARTBEAT_TIMEOUT_SECS, Duration::from_secs(secs))?;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_RECONNECT_BASE_DELAY_MS)? {
            config.reconnect_base_delay =
                non_zero(ENV_RECONNECT_BASE_DELAY_MS, Duration::from_millis(ms))?;
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, ENV_MAX_RECONNECT_ATTEMPTS)? {
            config.max_reconnect_attempts = attempts;
        }

        Ok(config)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        self.reconnect_base_delay
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
    }

    /// Override heartbeat timings. Both must be non-zero.
    pub fn with_heartbeat(
        mut self,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        self.heartbeat_interval = non_zero("heartbeat_interval", interval)?;
        self.heartbeat_timeout = non_zero("heartbeat_timeout", timeout)?;
        Ok(self)
    }

    /// Override the reconnect policy. `base_delay` must be non-zero; zero
    /// attempts disables reconnecting.
    pub fn with_reconnect(
        mut self,
        base_delay: Duration,
        max_attempts: u32,
    ) -> Result<Self, SessionError> {
        self.reconnect_base_delay = non_zero("reconnect_base_delay", base_delay)?;
        self.max_reconnect_attempts = max_attempts;
        Ok(self)
    }

    /// Address of a room: `<endpoint>/<percent-encoded room id>`.
    pub fn endpoint_for(&self, room_id: &str) -> Result<Url, SessionError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SessionError::invalid_endpoint(self.endpoint.as_str(), "cannot be a base"))?
            .pop_if_empty()
            .push(room_id);
        Ok(url)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, SessionError> {
    let url = Url::parse(raw.trim()).map_err(|e| SessionError::invalid_endpoint(raw, e))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(SessionError::invalid_endpoint(
            raw,
            format!("unsupported scheme '{other}'"),
        )),
    }
}

fn non_zero(key: &'static str, value: Duration) -> Result<Duration, SessionError> {
    if value.is_zero() {
        return Err(SessionError::InvalidConfig {
            key,
            value: format!("{value:?}"),
        });
    }
    Ok(value)
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, SessionError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SessionError::InvalidConfig { key, value: raw }),
    }
}
