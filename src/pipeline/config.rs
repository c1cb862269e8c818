use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::core::{FormType, IwError, RetryConfig, TimeWindow, WindowLabel};

/// Tunables of a pipeline run.
///
/// `Default` gives a 24 hour recent window compared against the 7 days
/// before it, Form 4 filings, one request per 100 ms and 50 requests per run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Length of the recent window, ending at `as_of`.
    pub recent_window: TimeDelta,
    /// Length of the baseline window, ending where the recent window starts.
    pub baseline_window: TimeDelta,
    /// End of the recent window; the run's start time when `None`.
    pub as_of: Option<DateTime<Utc>>,
    pub form_types: BTreeSet<FormType>,
    /// Entity symbols to restrict retrieval to; everything when `None`.
    pub universe: Option<BTreeSet<String>>,
    /// Minimum spacing between outbound requests.
    pub pacing_interval: Duration,
    /// Maximum outbound requests per run, retries included.
    pub request_budget: u32,
    pub retry: RetryConfig,
    pub request_timeout: Duration,
    pub page_size: usize,
    pub max_pages: usize,
    /// Bound for the sentiment provider call.
    pub sentiment_timeout: Duration,
    /// Entities shown in chart data and named in report facts.
    pub chart_top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            recent_window: TimeDelta::hours(24),
            baseline_window: TimeDelta::days(7),
            as_of: None,
            form_types: BTreeSet::from([FormType::Form4]),
            universe: None,
            pacing_interval: Duration::from_millis(100),
            request_budget: 50,
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
            page_size: 200,
            max_pages: 5,
            sentiment_timeout: Duration::from_secs(30),
            chart_top_n: 10,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn recent_window(mut self, len: TimeDelta) -> Self {
        self.recent_window = len;
        self
    }

    #[must_use]
    pub fn baseline_window(mut self, len: TimeDelta) -> Self {
        self.baseline_window = len;
        self
    }

    /// Pins the end of the recent window instead of using the current time.
    #[must_use]
    pub fn as_of(mut self, end: DateTime<Utc>) -> Self {
        self.as_of = Some(end);
        self
    }

    #[must_use]
    pub fn form_types(mut self, forms: impl IntoIterator<Item = FormType>) -> Self {
        self.form_types = forms.into_iter().collect();
        self
    }

    /// Restricts the run to these symbols (matched case-insensitively).
    #[must_use]
    pub fn universe<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.universe = Some(
            symbols
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .collect(),
        );
        self
    }

    #[must_use]
    pub const fn pacing_interval(mut self, dur: Duration) -> Self {
        self.pacing_interval = dur;
        self
    }

    #[must_use]
    pub const fn request_budget(mut self, limit: u32) -> Self {
        self.request_budget = limit;
        self
    }

    #[must_use]
    pub fn retry_policy(mut self, cfg: RetryConfig) -> Self {
        self.retry = cfg;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, dur: Duration) -> Self {
        self.request_timeout = dur;
        self
    }

    #[must_use]
    pub const fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    #[must_use]
    pub const fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    #[must_use]
    pub const fn sentiment_timeout(mut self, dur: Duration) -> Self {
        self.sentiment_timeout = dur;
        self
    }

    #[must_use]
    pub const fn chart_top_n(mut self, n: usize) -> Self {
        self.chart_top_n = n;
        self
    }

    /// Checks the settings and derives the two windows ending at `now`
    /// (or at `as_of`, when pinned).
    ///
    /// # Errors
    ///
    /// Returns a configuration-class error for a non-positive window length,
    /// an empty form-type set, or a zero page size.
    pub(crate) fn windows(&self, now: DateTime<Utc>) -> Result<(TimeWindow, TimeWindow), IwError> {
        if self.form_types.is_empty() {
            return Err(IwError::Config("at least one form type must be requested".into()));
        }
        if self.page_size == 0 || self.max_pages == 0 {
            return Err(IwError::Config("page size and max pages must be positive".into()));
        }
        let end = self.as_of.unwrap_or(now);
        let recent = TimeWindow::trailing(WindowLabel::Recent, end, self.recent_window)?;
        let baseline =
            TimeWindow::trailing(WindowLabel::Baseline, recent.start(), self.baseline_window)?;
        Ok((recent, baseline))
    }
}
