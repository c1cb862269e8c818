use std::collections::BTreeSet;

use futures::future::BoxFuture;

use crate::core::{FormType, IwError, TimeWindow};
use crate::filings::RawPayload;
use crate::pipeline::ChartData;
use crate::pipeline::report::ReportFacts;
use crate::sentiment::SentimentScore;

/// Parameters of one page query against a filing source.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// The window whose filings are requested.
    pub window: &'a TimeWindow,
    /// Form types to include.
    pub form_types: &'a BTreeSet<FormType>,
    /// Restricts results to these issuer symbols when set.
    pub universe: Option<&'a BTreeSet<String>>,
    /// Offset of the first result.
    pub from: usize,
    /// Maximum number of results in the page.
    pub size: usize,
}

/// One page of raw filing payloads.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Payloads in upstream order.
    pub payloads: Vec<RawPayload>,
    /// Total number of matches reported by the source, when it says so.
    pub total: Option<usize>,
}

/// An upstream that serves windowed filing queries.
///
/// One call is one outbound request; pacing, retries, budgets and fallback
/// are applied by [`crate::filings::FilingsFetcher`] around it. Implemented
/// by [`crate::IwClient`] over HTTP.
pub trait FilingSource: Send + Sync {
    /// Checks that the source is configured well enough to be called.
    ///
    /// # Errors
    ///
    /// Returns a configuration-class error (never retried).
    fn validate(&self) -> Result<(), IwError> {
        Ok(())
    }

    /// Fetches a single page.
    fn query_page<'a>(&'a self, req: PageRequest<'a>) -> BoxFuture<'a, Result<Page, IwError>>;
}

/// A source of per-entity sentiment scores (news, social, video).
pub trait SentimentProvider: Send + Sync {
    /// Scores for the given symbols, in any order. Symbols without data may
    /// simply be absent from the result.
    fn get_sentiment<'a>(
        &'a self,
        entity_symbols: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<SentimentScore>, IwError>>;
}

/// Turns a text corpus and structured facts into report prose.
pub trait ReportSynthesizer: Send + Sync {
    fn synthesize<'a>(
        &'a self,
        text_corpus: &'a str,
        facts: &'a ReportFacts,
    ) -> BoxFuture<'a, Result<String, IwError>>;
}

/// Renders chart-ready aggregates into an artifact (image bytes, HTML, ...).
pub trait ChartRenderer: Send + Sync {
    fn render<'a>(&'a self, data: &'a ChartData) -> BoxFuture<'a, Result<Vec<u8>, IwError>>;
}
