//! Public client surface + builder.
//! Internals are split into `retry` (policy), `pacer` (shared request
//! schedule), `budget` (per-run request cap) and `constants` (defaults).

mod budget;
mod constants;
mod pacer;
mod retry;

pub use budget::RequestBudget;
pub use pacer::Pacer;
pub use retry::{Backoff, RetryConfig};

use crate::core::IwError;
use constants::{
    DEFAULT_APP_NAME, DEFAULT_BASE_FILINGS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
    FILINGS_PATH,
};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// HTTP client for the upstream filing query API.
///
/// The client carries the caller identification that must accompany every
/// request. It holds no per-run state: pacing and budgets belong to the
/// pipeline run that uses it.
#[derive(Debug, Clone)]
pub struct IwClient {
    http: Client,
    base_filings: Url,
    app_name: String,
    contact: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl Default for IwClient {
    fn default() -> Self {
        Self::builder().build().expect("default client")
    }
}

impl IwClient {
    /// Create a new builder.
    pub fn builder() -> IwClientBuilder {
        IwClientBuilder::default()
    }

    /* -------- internal getters used by other modules -------- */

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn filings_url(&self) -> Result<Url, IwError> {
        Ok(self.base_filings.join(FILINGS_PATH)?)
    }

    pub(crate) fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// The configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The `User-Agent` value sent with every request.
    ///
    /// # Errors
    ///
    /// Returns [`IwError::Config`] when no contact was configured, so callers
    /// fail before any network call is attempted.
    pub fn identification(&self) -> Result<String, IwError> {
        match self.contact.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => Ok(format!("{} {}", self.app_name, c)),
            _ => Err(IwError::Config(
                "a caller contact (e.g. an e-mail address) is required for every upstream request"
                    .into(),
            )),
        }
    }
}

/* ----------------------- Builder ----------------------- */

#[derive(Default)]
pub struct IwClientBuilder {
    app_name: Option<String>,
    contact: Option<String>,
    api_key: Option<String>,
    base_filings: Option<Url>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl IwClientBuilder {
    /// Contact string identifying the caller (required before fetching).
    pub fn contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    /// Override the application token that prefixes the contact in the `User-Agent`.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// API key sent in the `Authorization` header.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the query API base (e.g., `https://api.sec-api.io/`).
    pub fn base_filings(mut self, url: Url) -> Self {
        self.base_filings = Some(url);
        self
    }

    /// Set the per-request timeout. Default: 30s.
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Set a connect timeout. Default: 10s.
    pub fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    pub fn build(self) -> Result<IwClient, IwError> {
        let base_filings = match self.base_filings {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_FILINGS)?,
        };
        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(
                self.connect_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            )
            .build()?;

        Ok(IwClient {
            http,
            base_filings,
            app_name: self.app_name.unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            contact: self.contact,
            api_key: self.api_key,
            timeout,
        })
    }
}
