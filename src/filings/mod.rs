//! Filing retrieval, normalization and deduplication.

mod api;
mod dedupe;
mod fallback;
mod normalize;
mod wire;

pub use dedupe::{DedupedWindows, dedupe, dedupe_windows, dedupe_with_stats};
pub use fallback::FallbackDataset;
pub use normalize::{NormalizedBatch, RejectionReason, normalize, normalize_batch};
pub use wire::{RawPayload, RawScalar};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::core::{
    FilingSource, FormType, IwError, Page, PageRequest, Pacer, RequestBudget, RetryConfig,
    TimeWindow,
};

/// Where the payloads of a window came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Fallback,
}

/// Result of fetching one window.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Raw payloads, live or substituted.
    pub payloads: Vec<RawPayload>,
    /// Whether live retrieval succeeded.
    pub source: DataSource,
    /// Why live retrieval was abandoned, when it was.
    pub fallback_reason: Option<String>,
    /// Outbound requests issued for this window.
    pub attempts: u32,
    /// Whether the run's request budget ran out during this fetch.
    pub budget_exhausted: bool,
}

impl FetchOutcome {
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.source == DataSource::Fallback
    }
}

enum PageFailure {
    // configuration-class; aborts the run
    Fatal(IwError),
    Degraded { reason: String, budget_exhausted: bool },
}

/// Rate-limited, retrying filing fetcher for one pipeline run.
///
/// All windows fetched through the same [`Pacer`] share one request
/// schedule, and all fetchers built with the same [`RequestBudget`] draw on
/// one request allowance.
#[derive(Clone)]
pub struct FilingsFetcher {
    source: Arc<dyn FilingSource>,
    pacer: Pacer,
    budget: RequestBudget,
    fallback: FallbackDataset,
    retry: RetryConfig,
    request_timeout: Duration,
    page_size: usize,
    max_pages: usize,
    universe: Option<BTreeSet<String>>,
}

impl FilingsFetcher {
    /// Creates a fetcher with default retry policy, a 30s request timeout,
    /// 200-result pages (at most 5) and no fallback data.
    pub fn new(source: Arc<dyn FilingSource>, pacer: Pacer, budget: RequestBudget) -> Self {
        Self {
            source,
            pacer,
            budget,
            fallback: FallbackDataset::empty(),
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
            page_size: 200,
            max_pages: 5,
            universe: None,
        }
    }

    /// Dataset served when live retrieval is exhausted.
    #[must_use]
    pub fn fallback(mut self, fallback: FallbackDataset) -> Self {
        self.fallback = fallback;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, cfg: RetryConfig) -> Self {
        self.retry = cfg;
        self
    }

    /// Upper bound for a single request.
    #[must_use]
    pub const fn request_timeout(mut self, dur: Duration) -> Self {
        self.request_timeout = dur;
        self
    }

    /// Results requested per page (at least 1).
    #[must_use]
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Maximum pages fetched per window (at least 1).
    #[must_use]
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages.max(1);
        self
    }

    /// Restricts live queries and fallback data to these symbols.
    #[must_use]
    pub fn universe(mut self, symbols: Option<BTreeSet<String>>) -> Self {
        self.universe = symbols.map(|u| u.into_iter().map(|s| s.trim().to_ascii_uppercase()).collect());
        self
    }

    /// The request budget shared by this fetcher.
    pub fn budget(&self) -> &RequestBudget {
        &self.budget
    }

    /// Fetches every page of `window`, falling back to the bundled dataset
    /// when live retrieval cannot complete.
    ///
    /// # Errors
    ///
    /// Only configuration-class errors are returned: a missing caller
    /// identification (checked before any request), an empty form-type set,
    /// or rejected credentials. Every other failure yields a
    /// [`DataSource::Fallback`] outcome.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err, fields(window = %window.label())))]
    pub async fn fetch(
        &self,
        window: &TimeWindow,
        form_types: &BTreeSet<FormType>,
    ) -> Result<FetchOutcome, IwError> {
        self.source.validate()?;
        if form_types.is_empty() {
            return Err(IwError::Config("at least one form type must be requested".into()));
        }

        let mut attempts = 0u32;
        if self.budget.is_exhausted() {
            let reason = self.budget_exhausted().to_string();
            return Ok(self.fall_back(window, form_types, reason, attempts, true));
        }

        let mut payloads = Vec::new();
        for page_no in 0..self.max_pages {
            let req = PageRequest {
                window,
                form_types,
                universe: self.universe.as_ref(),
                from: page_no * self.page_size,
                size: self.page_size,
            };
            match self.fetch_page(req, &mut attempts).await {
                Ok(page) => {
                    let n = page.payloads.len();
                    payloads.extend(page.payloads);
                    let reached_total = page.total.is_some_and(|t| payloads.len() >= t);
                    if n < self.page_size || reached_total {
                        break;
                    }
                }
                Err(PageFailure::Fatal(e)) => return Err(e),
                Err(PageFailure::Degraded {
                    reason,
                    budget_exhausted,
                }) => {
                    return Ok(self.fall_back(window, form_types, reason, attempts, budget_exhausted));
                }
            }
        }

        Ok(FetchOutcome {
            payloads,
            source: DataSource::Live,
            fallback_reason: None,
            attempts,
            budget_exhausted: false,
        })
    }

    async fn fetch_page(
        &self,
        req: PageRequest<'_>,
        attempts: &mut u32,
    ) -> Result<Page, PageFailure> {
        let mut retries = 0u32;
        let mut slept = Duration::ZERO;

        loop {
            if !self.budget.try_consume() {
                return Err(PageFailure::Degraded {
                    reason: self.budget_exhausted().to_string(),
                    budget_exhausted: true,
                });
            }
            self.pacer.acquire().await;
            *attempts += 1;

            let result =
                match tokio::time::timeout(self.request_timeout, self.source.query_page(req)).await
                {
                    Ok(r) => r,
                    Err(_) => Err(IwError::Timeout {
                        millis: u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
                        url: "filing source".into(),
                    }),
                };
            let err = match result {
                Ok(page) => return Ok(page),
                Err(e) => e,
            };

            if err.is_config() {
                return Err(PageFailure::Fatal(err));
            }
            if !self.retry.is_transient(&err) {
                return Err(PageFailure::Degraded {
                    reason: format!("non-transient failure: {err}"),
                    budget_exhausted: false,
                });
            }
            if retries >= self.retry.max_retries {
                return Err(PageFailure::Degraded {
                    reason: format!("gave up after {} attempts: {err}", retries + 1),
                    budget_exhausted: false,
                });
            }
            let delay = self.retry.delay_for(retries);
            if slept + delay > self.retry.max_total_backoff {
                return Err(PageFailure::Degraded {
                    reason: format!("backoff ceiling reached after {} attempts: {err}", retries + 1),
                    budget_exhausted: false,
                });
            }

            #[cfg(feature = "tracing")]
            tracing::warn!(
                window = %req.window.label(),
                attempt = retries + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient fetch failure, backing off"
            );
            tokio::time::sleep(delay).await;
            slept += delay;
            retries += 1;
        }
    }

    fn budget_exhausted(&self) -> IwError {
        IwError::BudgetExhausted {
            limit: self.budget.limit(),
        }
    }

    fn fall_back(
        &self,
        window: &TimeWindow,
        form_types: &BTreeSet<FormType>,
        reason: String,
        attempts: u32,
        budget_exhausted: bool,
    ) -> FetchOutcome {
        #[cfg(feature = "tracing")]
        tracing::warn!(window = %window.label(), %reason, "serving fallback filings");
        FetchOutcome {
            payloads: self
                .fallback
                .for_window(window.label(), form_types, self.universe.as_ref()),
            source: DataSource::Fallback,
            fallback_reason: Some(reason),
            attempts,
            budget_exhausted,
        }
    }
}
