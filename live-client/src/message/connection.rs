//! Connection state and reconnect backoff

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::TransportConfig;

/// Socket lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Delay before reconnect attempt `attempt` (0-based): `base * factor^attempt`, capped
pub fn backoff_delay(base: Duration, factor: f64, attempt: u32, cap: Duration) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let scaled = base.as_secs_f64() * factor.powi(exponent);
    if !scaled.is_finite() || scaled >= cap.as_secs_f64() {
        return cap;
    }
    // whole microseconds, so 0.1s * 1.5 is exactly 150ms
    Duration::from_micros((scaled * 1_000_000.0).round() as u64)
}

/// Connection bookkeeping owned by the live client
#[derive(Debug, Clone)]
pub struct Connection {
    state: ConnectionState,
    retry_count: u32,
    max_retries: u32,
    base_interval: Duration,
    backoff_factor: f64,
    max_delay: Duration,
    last_message_at: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_count: 0,
            max_retries: config.max_reconnect_attempts,
            base_interval: config.reconnect_interval,
            backoff_factor: config.backoff_factor,
            max_delay: config.max_reconnect_delay,
            last_message_at: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "Connection state changed");
            self.state = state;
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Delay for the next reconnect attempt, advancing the counter.
    ///
    /// `None` once `max_retries` attempts have been scheduled.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if !self.can_retry() {
            return None;
        }
        let delay = backoff_delay(
            self.base_interval,
            self.backoff_factor,
            self.retry_count,
            self.max_delay,
        );
        self.retry_count += 1;
        Some(delay)
    }

    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }

    /// Record inbound traffic
    pub fn touch(&mut self) {
        self.last_message_at = Some(Utc::now());
    }

    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TransportConfig {
        TransportConfig::new()
            .with_reconnect_interval(Duration::from_millis(1000))
            .with_max_reconnect_attempts(3)
    }

    #[test]
    fn test_backoff_grows_by_factor() {
        let cap = Duration::from_secs(60);
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 1.5, 0, cap), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 1.5, 1, cap), Duration::from_millis(1500));
        assert_eq!(backoff_delay(base, 1.5, 2, cap), Duration::from_millis(2250));
    }

    #[test]
    fn test_backoff_is_capped() {
        let cap = Duration::from_secs(5);
        assert_eq!(
            backoff_delay(Duration::from_secs(3), 1.5, 10, cap),
            Duration::from_secs(5)
        );
        assert_eq!(
            backoff_delay(Duration::from_secs(3), 1.5, u32::MAX, cap),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_next_backoff_stops_at_max() {
        let mut conn = Connection::new(&config());
        assert_eq!(conn.next_backoff(), Some(Duration::from_millis(1000)));
        assert_eq!(conn.next_backoff(), Some(Duration::from_millis(1500)));
        assert_eq!(conn.next_backoff(), Some(Duration::from_millis(2250)));
        assert_eq!(conn.next_backoff(), None);
        assert_eq!(conn.retry_count(), 3);

        conn.reset_retries();
        assert!(conn.can_retry());
        assert_eq!(conn.next_backoff(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_touch_records_timestamp() {
        let mut conn = Connection::new(&config());
        assert!(conn.last_message_at().is_none());
        conn.touch();
        assert!(conn.last_message_at().is_some());
    }
}
