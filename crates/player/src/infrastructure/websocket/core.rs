//! Platform-agnostic core logic for the session client.
//!
//! Deliberately free of channels and sockets: the session driver owns the
//! actual link and timers and calls into these for the backoff math and the
//! heartbeat bookkeeping. Deadlines are plain `Instant`s so the driver can
//! cancel a timer by dropping it.

use std::time::Duration;

use tokio::time::Instant;

use super::shared::BACKOFF_MULTIPLIER;

/// Exponential backoff state for reconnect attempts.
///
/// Attempt `k` (1-indexed) waits `base * 2^(k-1)`. The delay itself is not
/// capped; the number of attempts is.
#[derive(Debug, Clone, Copy)]
pub struct BackoffState {
    attempts: u32,
    base_delay: Duration,
    max_attempts: u32,
}

impl BackoffState {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            base_delay,
            max_attempts,
        }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Advance to the next attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt, or `None`
    /// once the cap is reached (the counter is left untouched).
    pub fn next_delay_and_advance(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        self.attempts += 1;
        let factor = BACKOFF_MULTIPLIER.saturating_pow(self.attempts - 1);
        Some(self.base_delay.saturating_mul(factor))
    }
}

/// Heartbeat deadlines for one open connection.
///
/// While running there is always a pending probe deadline; a timeout deadline
/// is armed by each probe and disarmed by any decoded inbound frame.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    timeout: Duration,
    last_seen: Instant,
    next_probe: Option<Instant>,
    timeout_at: Option<Instant>,
}

impl Heartbeat {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            last_seen: Instant::now(),
            next_probe: None,
            timeout_at: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.last_seen = now;
        // A deadline past the clock's range never fires
        self.next_probe = now.checked_add(self.interval);
        self.timeout_at = None;
    }

    pub fn stop(&mut self) {
        self.next_probe = None;
        self.timeout_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_probe.is_some()
    }

    pub fn next_probe(&self) -> Option<Instant> {
        self.next_probe
    }

    pub fn timeout_deadline(&self) -> Option<Instant> {
        self.timeout_at
    }

    /// Credit liveness for a successfully decoded inbound frame.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_seen = now;
        self.timeout_at = None;
    }

    /// A probe went out: arm the timeout and schedule the next probe.
    pub fn probe_sent(&mut self, now: Instant) {
        self.timeout_at = now.checked_add(self.timeout);
        self.next_probe = self
            .next_probe
            .and_then(|due| due.checked_add(self.interval));
    }

    /// The timeout fired. Returns whether the connection should be considered
    /// dead: nothing decoded for at least `interval + timeout`.
    pub fn timeout_elapsed(&mut self, now: Instant) -> bool {
        self.timeout_at = None;
        now.saturating_duration_since(self.last_seen) >= self.interval.saturating_add(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_backoff_doubles_until_cap() {
        let mut backoff = BackoffState::new(SECOND, 5);
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay_and_advance())
            .map(|d| d.as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000]);
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.attempts(), 5);
        assert_eq!(backoff.next_delay_and_advance(), None);
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn test_backoff_reset_restarts_sequence() {
        let mut backoff = BackoffState::new(SECOND, 5);
        backoff.next_delay_and_advance();
        backoff.next_delay_and_advance();
        backoff.reset();

        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay_and_advance(), Some(SECOND));
    }

    #[test]
    fn test_backoff_zero_attempts_never_retries() {
        let mut backoff = BackoffState::new(SECOND, 0);
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_delay_and_advance(), None);
    }

    #[test]
    fn test_heartbeat_probe_schedule() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::new(30 * SECOND, 10 * SECOND);
        assert!(!hb.is_running());

        hb.start(t0);
        assert_eq!(hb.next_probe(), Some(t0 + 30 * SECOND));
        assert_eq!(hb.timeout_deadline(), None);

        hb.probe_sent(t0 + 30 * SECOND);
        assert_eq!(hb.timeout_deadline(), Some(t0 + 40 * SECOND));
        assert_eq!(hb.next_probe(), Some(t0 + 60 * SECOND));
    }

    #[test]
    fn test_heartbeat_silent_connection_times_out() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::new(30 * SECOND, 10 * SECOND);
        hb.start(t0);
        hb.probe_sent(t0 + 30 * SECOND);

        assert!(hb.timeout_elapsed(t0 + 40 * SECOND));
        assert_eq!(hb.timeout_deadline(), None);
    }

    #[test]
    fn test_heartbeat_late_frame_keeps_connection() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::new(30 * SECOND, 10 * SECOND);
        hb.start(t0);
        hb.probe_sent(t0 + 30 * SECOND);

        // A frame just before the timeout fires disarms it
        hb.record_activity(t0 + 39 * SECOND);
        assert_eq!(hb.timeout_deadline(), None);

        // Even if a stale timeout still fires, the double-check passes
        assert!(!hb.timeout_elapsed(t0 + 40 * SECOND));
    }

    #[test]
    fn test_heartbeat_out_of_range_interval_never_probes() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::new(Duration::MAX, Duration::MAX);
        hb.start(t0);

        assert_eq!(hb.next_probe(), None);
        hb.probe_sent(t0);
        assert_eq!(hb.timeout_deadline(), None);
        assert!(!hb.timeout_elapsed(t0 + 3600 * SECOND));
    }

    #[test]
    fn test_heartbeat_stop_clears_deadlines() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::new(30 * SECOND, 10 * SECOND);
        hb.start(t0);
        hb.probe_sent(t0 + 30 * SECOND);
        hb.stop();

        assert!(!hb.is_running());
        assert_eq!(hb.next_probe(), None);
        assert_eq!(hb.timeout_deadline(), None);
    }
}
