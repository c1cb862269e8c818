use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Per-run cap on outbound requests, shared by every fetch of the run.
#[derive(Debug, Clone)]
pub struct RequestBudget {
    used: Arc<AtomicU32>,
    limit: u32,
}

impl RequestBudget {
    /// A budget that allows `limit` requests.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            used: Arc::new(AtomicU32::new(0)),
            limit,
        }
    }

    /// Claims one request. Returns `false` once the budget is spent.
    pub fn try_consume(&self) -> bool {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    /// Requests claimed so far.
    #[must_use]
    pub fn used(&self) -> u32 {
        self.used.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used())
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }
}
