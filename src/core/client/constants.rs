//! Centralized constants for default endpoints and the identification prefix.

/// Application token placed before the contact string in the `User-Agent`.
pub(crate) const DEFAULT_APP_NAME: &str = concat!("insiderwatch-rs/", env!("CARGO_PKG_VERSION"));

/// Filing query API base (`insider-trading` is appended).
pub(crate) const DEFAULT_BASE_FILINGS: &str = "https://api.sec-api.io/";

/// Path of the insider-trading query endpoint relative to the base.
pub(crate) const FILINGS_PATH: &str = "insider-trading";

/// Default per-request timeout.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout.
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
