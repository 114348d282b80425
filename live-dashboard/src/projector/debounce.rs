//! Fixed-window debounce
//!
//! The first change in a window arms the deadline; later changes only
//! keep the pending flag set. One recomputation per window at most.

use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Mark a pending change. Returns `true` when this call opened the window.
    pub fn arm(&mut self) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(Instant::now() + self.window);
        true
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Deadline reached (or forced flush): clears the pending flag
    pub fn fire(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Drop a pending window without recomputing
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Sleep until the armed deadline; never resolves while idle
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
