use thiserror::Error;

/// The primary error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum IwError {
    /// An error occurred during an HTTP request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A response body could not be decoded as JSON.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// A single request did not complete within its time limit.
    #[error("request timed out after {millis}ms at {url}")]
    Timeout {
        /// Elapsed limit in milliseconds.
        millis: u64,
        /// The URL (or source name) that timed out.
        url: String,
    },

    /// The upstream answered with HTTP 429.
    #[error("rate limited at {url}")]
    RateLimited {
        /// The URL that returned the error.
        url: String,
    },

    /// The upstream answered with a 5xx status.
    #[error("server error {status} at {url}")]
    ServerError {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },

    /// The requested resource does not exist.
    #[error("not found at {url}")]
    NotFound {
        /// The URL that returned the error.
        url: String,
    },

    /// The server returned an unexpected or unsuccessful HTTP status code.
    #[error("Unexpected response status: {status} at {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },

    /// Credentials were rejected by the upstream (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Required settings are missing or invalid. Raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// The data received was in an unexpected format or was missing a required field.
    #[error("Data format unexpected or missing field: {0}")]
    Data(String),

    /// An invalid time window was provided (start must be before end).
    #[error("invalid date range: start must be before end")]
    InvalidDates,

    /// The per-run request budget has been spent.
    #[error("request budget of {limit} exhausted")]
    BudgetExhausted {
        /// Configured budget for the run.
        limit: u32,
    },
}

impl IwError {
    /// Maps a non-success HTTP status to the matching variant.
    pub(crate) fn from_status(status: u16, url: &str) -> Self {
        let url = url.to_string();
        match status {
            401 | 403 => Self::Auth(format!("upstream rejected credentials ({status}) at {url}")),
            404 => Self::NotFound { url },
            429 => Self::RateLimited { url },
            500..=599 => Self::ServerError { status, url },
            _ => Self::Status { status, url },
        }
    }

    /// Configuration-class errors abort a run instead of degrading it.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Auth(_) | Self::InvalidDates)
    }

    /// The HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::NotFound { .. } => Some(404),
            Self::ServerError { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
