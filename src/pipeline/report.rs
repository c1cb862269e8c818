//! Report facts derived from a run, and hand-off to the external
//! synthesizer and renderer.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::compare::VolumeRatio;
use crate::core::{ChartRenderer, IwError, ReportSynthesizer, TimeWindow, WindowLabel};
use crate::filings::DataSource;
use crate::pipeline::{ChartData, PipelineRunResult};
use crate::sentiment::{SentimentLabel, SignalAlignment};

/// One of the most active entities of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveEntity {
    pub entity_symbol: String,
    pub recent_bought: u64,
    pub recent_sold: u64,
    pub volume_delta: i64,
    pub volume_ratio: VolumeRatio,
    pub distinct_insiders: u64,
    pub sentiment: SentimentLabel,
    pub polarity: f64,
    pub alignment: SignalAlignment,
}

/// Sentiment labels counted over all entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SentimentSummary {
    pub available: bool,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

/// Structured facts a report is written from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportFacts {
    pub generated_at: DateTime<Utc>,
    pub recent_window: TimeWindow,
    pub baseline_window: TimeWindow,
    pub entity_count: usize,
    pub recent_transactions: u64,
    pub baseline_transactions: u64,
    pub recent_shares_bought: u64,
    pub recent_shares_sold: u64,
    pub recent_value_bought: Decimal,
    pub recent_value_sold: Decimal,
    pub most_active: Vec<ActiveEntity>,
    pub data_sources: BTreeMap<WindowLabel, DataSource>,
    pub rejected_count: usize,
    pub duplicates_removed: usize,
    pub sentiment: SentimentSummary,
}

impl ReportFacts {
    /// Summarizes `result`, naming at most `top_n` entities.
    #[must_use]
    pub fn from_result(result: &PipelineRunResult, top_n: usize) -> Self {
        let d = &result.diagnostics;

        let mut facts = Self {
            generated_at: result.generated_at,
            recent_window: result.recent_window,
            baseline_window: result.baseline_window,
            entity_count: result.entities.len(),
            recent_transactions: 0,
            baseline_transactions: 0,
            recent_shares_bought: 0,
            recent_shares_sold: 0,
            recent_value_bought: Decimal::ZERO,
            recent_value_sold: Decimal::ZERO,
            most_active: Vec::new(),
            data_sources: [WindowLabel::Recent, WindowLabel::Baseline]
                .into_iter()
                .map(|label| {
                    let src = if d.used_fallback.get(&label).copied().unwrap_or(false) {
                        DataSource::Fallback
                    } else {
                        DataSource::Live
                    };
                    (label, src)
                })
                .collect(),
            rejected_count: d.rejected_count,
            duplicates_removed: d.duplicates_removed,
            sentiment: SentimentSummary {
                available: !d.sentiment_unavailable,
                ..SentimentSummary::default()
            },
        };

        for r in result.entities.values() {
            let (recent, baseline) = (&r.comparison.recent, &r.comparison.baseline);
            facts.recent_transactions = facts
                .recent_transactions
                .saturating_add(recent.transaction_count);
            facts.baseline_transactions = facts
                .baseline_transactions
                .saturating_add(baseline.transaction_count);
            facts.recent_shares_bought = facts
                .recent_shares_bought
                .saturating_add(recent.total_shares_bought);
            facts.recent_shares_sold = facts
                .recent_shares_sold
                .saturating_add(recent.total_shares_sold);
            facts.recent_value_bought =
                saturating_sum(facts.recent_value_bought, recent.total_value_bought);
            facts.recent_value_sold = saturating_sum(facts.recent_value_sold, recent.total_value_sold);
            match r.sentiment.label {
                SentimentLabel::Positive => facts.sentiment.positive += 1,
                SentimentLabel::Negative => facts.sentiment.negative += 1,
                SentimentLabel::Neutral => facts.sentiment.neutral += 1,
            }
        }

        facts.most_active = result
            .ranked()
            .into_iter()
            .take(top_n)
            .map(|r| ActiveEntity {
                entity_symbol: r.comparison.entity_symbol.clone(),
                recent_bought: r.comparison.recent.total_shares_bought,
                recent_sold: r.comparison.recent.total_shares_sold,
                volume_delta: r.comparison.volume_delta,
                volume_ratio: r.comparison.volume_ratio,
                distinct_insiders: r.comparison.recent.distinct_insiders,
                sentiment: r.sentiment.label,
                polarity: r.sentiment.polarity,
                alignment: r.alignment,
            })
            .collect();

        facts
    }

    /// Plain-text rendition handed to the synthesizer as its corpus.
    #[must_use]
    pub fn corpus(&self) -> String {
        let mut out = String::new();
        let fmt_ts = |t: DateTime<Utc>| t.format("%Y-%m-%d %H:%M UTC").to_string();

        let _ = writeln!(out, "Insider trading activity report");
        let _ = writeln!(out, "Generated: {}", fmt_ts(self.generated_at));
        let _ = writeln!(
            out,
            "Recent window: {} to {}",
            fmt_ts(self.recent_window.start()),
            fmt_ts(self.recent_window.end())
        );
        let _ = writeln!(
            out,
            "Baseline window: {} to {}",
            fmt_ts(self.baseline_window.start()),
            fmt_ts(self.baseline_window.end())
        );
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} entities; {} recent transactions versus {} in the baseline.",
            self.entity_count, self.recent_transactions, self.baseline_transactions
        );
        let _ = writeln!(
            out,
            "Recent purchases: {} shares (${}). Recent sales: {} shares (${}).",
            self.recent_shares_bought,
            self.recent_value_bought.round_dp(2),
            self.recent_shares_sold,
            self.recent_value_sold.round_dp(2)
        );

        if !self.most_active.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Most active:");
            for e in &self.most_active {
                let ratio = match e.volume_ratio {
                    VolumeRatio::Numeric(v) => format!("{v:.2}x baseline"),
                    VolumeRatio::NewActivity => "new activity".to_string(),
                    VolumeRatio::NoActivity => "no activity".to_string(),
                };
                let _ = writeln!(
                    out,
                    "- {}: bought {}, sold {}, delta {:+} ({ratio}), {} insiders; sentiment {} ({:+.2}), {}",
                    e.entity_symbol,
                    e.recent_bought,
                    e.recent_sold,
                    e.volume_delta,
                    e.distinct_insiders,
                    e.sentiment,
                    e.polarity,
                    alignment_text(e.alignment),
                );
            }
        }

        let _ = writeln!(out);
        if self.sentiment.available {
            let _ = writeln!(
                out,
                "Sentiment: {} positive, {} negative, {} neutral.",
                self.sentiment.positive, self.sentiment.negative, self.sentiment.neutral
            );
        } else {
            let _ = writeln!(out, "Sentiment: unavailable for this run.");
        }
        for (label, src) in &self.data_sources {
            if *src == DataSource::Fallback {
                let _ = writeln!(out, "Note: {label} window uses sample data (live retrieval failed).");
            }
        }
        if self.rejected_count > 0 {
            let _ = writeln!(out, "Note: {} malformed filings were skipped.", self.rejected_count);
        }
        out
    }
}

// Per-entity values are bounded by the comparison stage; their sum is not.
fn saturating_sum(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or(Decimal::MAX)
}

const fn alignment_text(a: SignalAlignment) -> &'static str {
    match a {
        SignalAlignment::Confirming => "insiders agree with sentiment",
        SignalAlignment::Diverging => "insiders diverge from sentiment",
        SignalAlignment::Inconclusive => "no clear signal",
    }
}

/// Outcome of handing a run to the external collaborators.
#[derive(Debug)]
pub struct Publication {
    pub facts: ReportFacts,
    pub chart: ChartData,
    /// Synthesized report text.
    pub report: Result<String, IwError>,
    /// Rendered chart artifact.
    pub artifact: Result<Vec<u8>, IwError>,
}

impl Publication {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.report.is_ok() && self.artifact.is_ok()
    }
}

/// Calls the synthesizer and the renderer concurrently; neither failure
/// affects the other.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub async fn publish(
    result: &PipelineRunResult,
    synthesizer: &dyn ReportSynthesizer,
    renderer: &dyn ChartRenderer,
    top_n: usize,
) -> Publication {
    let facts = ReportFacts::from_result(result, top_n);
    let chart = ChartData::from_result(result, top_n);
    let corpus = facts.corpus();

    let (report, artifact) = tokio::join!(
        synthesizer.synthesize(&corpus, &facts),
        renderer.render(&chart),
    );

    #[cfg(feature = "tracing")]
    {
        if let Err(e) = &report {
            tracing::warn!(error = %e, "report synthesis failed");
        }
        if let Err(e) = &artifact {
            tracing::warn!(error = %e, "chart rendering failed");
        }
    }

    Publication {
        facts,
        chart,
        report,
        artifact,
    }
}
