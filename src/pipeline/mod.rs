//! Orchestration of one analysis run.
//!
//! A run moves through [`Stage::ALL`] in order. Both windows are fetched
//! concurrently through one shared [`Pacer`] and [`RequestBudget`]; every
//! later stage is a sequential transformation over what was fetched.
//! Degradations (fallback data, rejected records, a failing sentiment
//! provider) are recorded in [`RunDiagnostics`]; only configuration errors
//! and stage-fatal errors fail a run.

pub mod charts;
mod config;
mod diagnostics;
pub mod report;

pub use charts::{ChartData, ChartEntity, WindowTotals};
pub use config::PipelineConfig;
pub use diagnostics::{RunDiagnostics, Stage, StageFailure};
pub use report::{Publication, ReportFacts, publish};

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::compare::{self, ComparisonResult};
use crate::core::{
    ChartRenderer, FilingSource, IwError, Pacer, ReportSynthesizer, RequestBudget,
    SentimentProvider, TimeWindow, WindowLabel,
};
use crate::filings::{
    DedupedWindows, FallbackDataset, FetchOutcome, FilingsFetcher, dedupe_windows,
    normalize_batch,
};
use crate::sentiment::{self, CombinedSentiment, SignalAlignment};

/// Cooperative cancellation flag, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the run stop before its next stage.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a run produced no result.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Missing identification, rejected credentials or invalid settings.
    #[error("configuration error: {0}")]
    Config(IwError),

    #[error("stage {stage} failed: {cause}")]
    StageFailed {
        stage: Stage,
        cause: String,
        diagnostics: Box<RunDiagnostics>,
    },

    #[error("run cancelled before {before}")]
    Cancelled {
        before: Stage,
        diagnostics: Box<RunDiagnostics>,
    },
}

impl RunError {
    /// Diagnostics recorded up to the point the run stopped.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&RunDiagnostics> {
        match self {
            Self::Config(_) => None,
            Self::StageFailed { diagnostics, .. } | Self::Cancelled { diagnostics, .. } => {
                Some(diagnostics)
            }
        }
    }
}

/// Comparison, sentiment and their agreement for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReport {
    pub comparison: ComparisonResult,
    pub sentiment: CombinedSentiment,
    pub alignment: SignalAlignment,
}

/// Output of a successful run; the sole input of reporting and charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRunResult {
    pub entities: BTreeMap<String, EntityReport>,
    pub diagnostics: RunDiagnostics,
    pub recent_window: TimeWindow,
    pub baseline_window: TimeWindow,
    pub generated_at: DateTime<Utc>,
}

impl PipelineRunResult {
    /// Entity reports, largest volume increase first.
    #[must_use]
    pub fn ranked(&self) -> Vec<&EntityReport> {
        let mut v: Vec<_> = self.entities.values().collect();
        v.sort_by(|a, b| compare::ranking_order(&a.comparison, &b.comparison));
        v
    }
}

type StageHook = Arc<dyn Fn(Stage, &RunDiagnostics) + Send + Sync>;

/// Runs fetch, normalization, deduplication, comparison and sentiment
/// correlation over a recent and a baseline window.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn FilingSource>,
    sentiment: Arc<dyn SentimentProvider>,
    config: PipelineConfig,
    fallback: Option<FallbackDataset>,
    on_stage_complete: Option<StageHook>,
}

impl Pipeline {
    /// A pipeline with default settings and the bundled fallback dataset.
    pub fn new(source: Arc<dyn FilingSource>, sentiment: Arc<dyn SentimentProvider>) -> Self {
        Self {
            source,
            sentiment,
            config: PipelineConfig::default(),
            fallback: None,
            on_stage_complete: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the bundled fallback dataset.
    #[must_use]
    pub fn fallback(mut self, fallback: FallbackDataset) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Observer invoked after every completed stage.
    #[must_use]
    pub fn on_stage_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(Stage, &RunDiagnostics) + Send + Sync + 'static,
    {
        self.on_stage_complete = Some(Arc::new(hook));
        self
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.config
    }

    /// Executes one run.
    ///
    /// Each call builds its own pacer, request budget and aggregates; nothing
    /// carries over between runs, and a failed run is never retried here.
    ///
    /// # Errors
    ///
    /// [`RunError::Config`] for configuration-class problems (checked before
    /// any stage starts, or reported by the filing source),
    /// [`RunError::StageFailed`] when a stage cannot produce output, and
    /// [`RunError::Cancelled`] when `cancel` was set between stages.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
    pub async fn run(&self, cancel: &CancelToken) -> Result<PipelineRunResult, RunError> {
        let (recent_window, baseline_window) =
            self.config.windows(Utc::now()).map_err(RunError::Config)?;
        self.source.validate().map_err(RunError::Config)?;
        let fallback = match &self.fallback {
            Some(f) => f.clone(),
            None => FallbackDataset::bundled().map_err(RunError::Config)?,
        };

        let mut diag = RunDiagnostics::default();

        // Fetching
        checkpoint(cancel, Stage::Fetching, &diag)?;
        let fetcher = FilingsFetcher::new(
            Arc::clone(&self.source),
            Pacer::new(self.config.pacing_interval),
            RequestBudget::new(self.config.request_budget),
        )
        .fallback(fallback)
        .retry_policy(self.config.retry.clone())
        .request_timeout(self.config.request_timeout)
        .page_size(self.config.page_size)
        .max_pages(self.config.max_pages)
        .universe(self.config.universe.clone());

        let (recent_fetch, baseline_fetch) = tokio::join!(
            fetcher.fetch(&recent_window, &self.config.form_types),
            fetcher.fetch(&baseline_window, &self.config.form_types),
        );
        let recent_fetch = recent_fetch.map_err(|e| fetch_error(e, &diag))?;
        let baseline_fetch = baseline_fetch.map_err(|e| fetch_error(e, &diag))?;
        for (label, outcome) in [
            (WindowLabel::Recent, &recent_fetch),
            (WindowLabel::Baseline, &baseline_fetch),
        ] {
            record_fetch(&mut diag, label, outcome);
        }
        self.complete(Stage::Fetching, &mut diag);

        // Normalizing
        checkpoint(cancel, Stage::Normalizing, &diag)?;
        let (recent, baseline) = guarded(Stage::Normalizing, &diag, || {
            Ok((
                normalize_batch(&recent_fetch.payloads),
                normalize_batch(&baseline_fetch.payloads),
            ))
        })?;
        for batch in [&recent, &baseline] {
            diag.rejected_count += batch.rejected_count();
            for (kind, n) in batch.rejection_counts() {
                *diag.rejections.entry(kind).or_insert(0) += n;
            }
        }
        self.complete(Stage::Normalizing, &mut diag);

        // Deduplicating
        checkpoint(cancel, Stage::Deduplicating, &diag)?;
        let DedupedWindows {
            recent,
            baseline,
            removed,
        } = guarded(Stage::Deduplicating, &diag, || {
            Ok(dedupe_windows(recent.records, baseline.records))
        })?;
        diag.duplicates_removed = removed;
        self.complete(Stage::Deduplicating, &mut diag);

        // Comparing
        checkpoint(cancel, Stage::Comparing, &diag)?;
        let comparisons = guarded(Stage::Comparing, &diag, || compare::compare(&recent, &baseline))?;
        self.complete(Stage::Comparing, &mut diag);

        // Correlating
        checkpoint(cancel, Stage::Correlating, &diag)?;
        let scores = self.fetch_sentiment(&comparisons, &mut diag).await;
        let entities = guarded(Stage::Correlating, &diag, || {
            let sentiments = sentiment::correlate(&scores, &comparisons);
            Ok(assemble(comparisons, sentiments))
        })?;
        self.complete(Stage::Correlating, &mut diag);

        #[cfg(feature = "tracing")]
        tracing::info!(
            entities = entities.len(),
            degraded = diag.is_degraded(),
            requests = diag.requests_issued,
            "pipeline run complete"
        );

        Ok(PipelineRunResult {
            entities,
            diagnostics: diag,
            recent_window,
            baseline_window,
            generated_at: Utc::now(),
        })
    }

    /// Hands `result` to both collaborators, using the configured chart size.
    pub async fn publish(
        &self,
        result: &PipelineRunResult,
        synthesizer: &dyn ReportSynthesizer,
        renderer: &dyn ChartRenderer,
    ) -> Publication {
        publish(result, synthesizer, renderer, self.config.chart_top_n).await
    }

    async fn fetch_sentiment(
        &self,
        comparisons: &BTreeMap<String, ComparisonResult>,
        diag: &mut RunDiagnostics,
    ) -> Vec<sentiment::SentimentScore> {
        if comparisons.is_empty() {
            return Vec::new();
        }
        let symbols: Vec<String> = comparisons.keys().cloned().collect();
        let res = tokio::time::timeout(
            self.config.sentiment_timeout,
            self.sentiment.get_sentiment(&symbols),
        )
        .await;
        match res {
            Ok(Ok(scores)) => scores,
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "sentiment provider failed; scoring neutral");
                diag.sentiment_unavailable = true;
                Vec::new()
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("sentiment provider timed out; scoring neutral");
                diag.sentiment_unavailable = true;
                Vec::new()
            }
        }
    }

    fn complete(&self, stage: Stage, diag: &mut RunDiagnostics) {
        diag.stages_completed.push(stage);
        if let Some(hook) = &self.on_stage_complete {
            hook(stage, diag);
        }
    }
}

fn checkpoint(cancel: &CancelToken, next: Stage, diag: &RunDiagnostics) -> Result<(), RunError> {
    if cancel.is_cancelled() {
        #[cfg(feature = "tracing")]
        tracing::info!(before = %next, "pipeline run cancelled");
        return Err(RunError::Cancelled {
            before: next,
            diagnostics: Box::new(diag.clone()),
        });
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(stage = %next, "entering stage");
    Ok(())
}

fn fetch_error(err: IwError, diag: &RunDiagnostics) -> RunError {
    if err.is_config() {
        RunError::Config(err)
    } else {
        stage_failed(Stage::Fetching, err.to_string(), diag)
    }
}

fn assemble(
    comparisons: BTreeMap<String, ComparisonResult>,
    mut sentiments: BTreeMap<String, CombinedSentiment>,
) -> BTreeMap<String, EntityReport> {
    comparisons
        .into_iter()
        .map(|(symbol, comparison)| {
            let sentiment = sentiments
                .remove(&symbol)
                .unwrap_or_else(|| CombinedSentiment::neutral(symbol.as_str()));
            let alignment =
                SignalAlignment::from_signals(comparison.recent.net_shares(), sentiment.label);
            (
                symbol,
                EntityReport {
                    comparison,
                    sentiment,
                    alignment,
                },
            )
        })
        .collect()
}

fn record_fetch(diag: &mut RunDiagnostics, label: WindowLabel, outcome: &FetchOutcome) {
    diag.records_fetched.insert(label, outcome.payloads.len());
    diag.used_fallback.insert(label, outcome.used_fallback());
    if let Some(reason) = &outcome.fallback_reason {
        diag.fallback_reasons.insert(label, reason.clone());
    }
    diag.requests_issued += outcome.attempts;
    diag.budget_exhausted |= outcome.budget_exhausted;
}

fn stage_failed(stage: Stage, cause: String, diag: &RunDiagnostics) -> RunError {
    #[cfg(feature = "tracing")]
    tracing::error!(%stage, %cause, "stage failed");
    let mut diagnostics = diag.clone();
    diagnostics.failure = Some(StageFailure {
        stage,
        cause: cause.clone(),
    });
    RunError::StageFailed {
        stage,
        cause,
        diagnostics: Box::new(diagnostics),
    }
}

/// Runs a synchronous stage body, turning both `Err` and panics into a
/// stage failure.
fn guarded<T>(
    stage: Stage,
    diag: &RunDiagnostics,
    body: impl FnOnce() -> Result<T, IwError>,
) -> Result<T, RunError> {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(stage_failed(stage, e.to_string(), diag)),
        Err(panic) => Err(stage_failed(stage, panic_message(panic.as_ref()), diag)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
