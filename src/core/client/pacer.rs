//! Shared request pacing for one pipeline run.
//!
//! A single "next allowed request time" is reserved under a mutex before
//! every outbound request, so concurrent window fetches serialize through
//! the same schedule and can never issue two requests closer together than
//! the configured interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct PacerState {
    next_allowed: Option<Instant>,
    issued: Vec<Instant>,
}

/// Cloneable handle to a minimum-interval request schedule.
#[derive(Debug, Clone)]
pub struct Pacer {
    state: Arc<Mutex<PacerState>>,
    min_interval: Duration,
}

impl Pacer {
    /// Creates a pacer that spaces requests at least `min_interval` apart.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(PacerState::default())),
            min_interval,
        }
    }

    /// The configured spacing between requests.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the caller may issue its request.
    ///
    /// The slot is reserved while the lock is held; the sleep happens after
    /// the lock is released so other tasks can queue behind it.
    pub async fn acquire(&self) {
        let slot = {
            let mut st = self.state.lock().await;
            let now = Instant::now();
            let slot = match st.next_allowed {
                Some(next) if next > now => next,
                _ => now,
            };
            st.next_allowed = Some(slot + self.min_interval);
            st.issued.push(slot);
            slot
        };

        let now = Instant::now();
        if slot > now {
            #[cfg(feature = "tracing")]
            tracing::debug!(wait_ms = (slot - now).as_millis() as u64, "pacer: waiting for request slot");
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Slots handed out so far, in reservation order.
    pub async fn issued(&self) -> Vec<Instant> {
        self.state.lock().await.issued.clone()
    }
}
