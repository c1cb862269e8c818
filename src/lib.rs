//! insiderwatch-rs: insider-trading filing analytics.
//!
//! Fetches Form 3/4/5 filings for a recent window and a baseline window from
//! a rate-limited upstream, normalizes and deduplicates them, compares
//! per-entity activity between the windows and merges market sentiment onto
//! the result. Report synthesis, chart rendering and sentiment retrieval are
//! external collaborators behind traits.
//!
//! ```no_run
//! use std::sync::Arc;
//! use insiderwatch_rs::{CancelToken, IwClient, Pipeline, PipelineConfig, StaticSentiment};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IwClient::builder()
//!     .contact("research@example.com")
//!     .api_key("sec-api-key")
//!     .build()?;
//! let pipeline = Pipeline::new(Arc::new(client), Arc::new(StaticSentiment::default()))
//!     .config(PipelineConfig::default().universe(["AAPL", "MSFT"]));
//!
//! let result = pipeline.run(&CancelToken::new()).await?;
//! for entity in result.ranked() {
//!     println!("{} {:+}", entity.comparison.entity_symbol, entity.comparison.volume_delta);
//! }
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod core;
pub mod filings;
pub mod pipeline;
pub mod sentiment;

pub use compare::{ComparisonResult, EntityAggregate, VolumeRatio, compare, rank};
pub use crate::core::{
    Backoff, ChartRenderer, FilingRecord, FilingSource, FormType, InsiderRole, IwClient,
    IwClientBuilder, IwError, Pacer, ReportSynthesizer, RequestBudget, RetryConfig,
    SentimentProvider, TimeWindow, TransactionType, WindowLabel,
};
pub use filings::{
    DataSource, DedupedWindows, FallbackDataset, FetchOutcome, FilingsFetcher, RawPayload,
    RejectionReason, dedupe, dedupe_windows, normalize,
};
pub use pipeline::{
    CancelToken, ChartData, EntityReport, Pipeline, PipelineConfig, PipelineRunResult,
    Publication, ReportFacts, RunDiagnostics, RunError, Stage, StageFailure,
};
pub use sentiment::{
    CombinedSentiment, SentimentLabel, SentimentScore, SentimentSource, SignalAlignment,
    StaticSentiment, correlate,
};
