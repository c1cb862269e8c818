//! Chart-ready views of a run, for an external renderer.

use chrono::TimeDelta;
use serde::Serialize;

use crate::core::TimeWindow;
use crate::pipeline::PipelineRunResult;

/// One bar group of the recent-versus-baseline chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartEntity {
    pub entity_symbol: String,
    pub recent_volume: u64,
    pub baseline_volume: u64,
    /// Baseline volume scaled to the length of the recent window.
    pub baseline_average: f64,
    pub recent_bought: u64,
    pub recent_sold: u64,
    pub volume_delta: i64,
}

/// Whole-run totals per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WindowTotals {
    pub recent_transactions: u64,
    pub baseline_transactions: u64,
    pub recent_volume: u64,
    pub baseline_volume: u64,
}

/// Input of a [`crate::core::ChartRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Series name of the recent bars, e.g. "Last 24 Hours".
    pub recent_label: String,
    /// Series name of the baseline bars, e.g. "Prior 7-Day Average".
    pub baseline_label: String,
    pub recent_window: TimeWindow,
    pub baseline_window: TimeWindow,
    /// Top entities in ranking order.
    pub entities: Vec<ChartEntity>,
    /// Totals over every entity, not just the charted ones.
    pub totals: WindowTotals,
}

impl ChartData {
    /// Builds chart data for the `top_n` highest-ranked entities.
    #[must_use]
    pub fn from_result(result: &PipelineRunResult, top_n: usize) -> Self {
        let scale = window_scale(result.recent_window.duration(), result.baseline_window.duration());

        let entities = result
            .ranked()
            .into_iter()
            .take(top_n)
            .map(|r| {
                let c = &r.comparison;
                let baseline_volume = c.baseline.total_volume();
                #[allow(clippy::cast_precision_loss)]
                let baseline_average = baseline_volume as f64 * scale;
                ChartEntity {
                    entity_symbol: c.entity_symbol.clone(),
                    recent_volume: c.recent.total_volume(),
                    baseline_volume,
                    baseline_average,
                    recent_bought: c.recent.total_shares_bought,
                    recent_sold: c.recent.total_shares_sold,
                    volume_delta: c.volume_delta,
                }
            })
            .collect();

        let mut totals = WindowTotals::default();
        for r in result.entities.values() {
            let c = &r.comparison;
            totals.recent_transactions =
                totals.recent_transactions.saturating_add(c.recent.transaction_count);
            totals.baseline_transactions =
                totals.baseline_transactions.saturating_add(c.baseline.transaction_count);
            totals.recent_volume = totals.recent_volume.saturating_add(c.recent.total_volume());
            totals.baseline_volume = totals
                .baseline_volume
                .saturating_add(c.baseline.total_volume());
        }

        Self {
            recent_label: format!("Last {}", span_name(result.recent_window.duration(), false)),
            baseline_label: format!(
                "Prior {} Average",
                span_name(result.baseline_window.duration(), true)
            ),
            recent_window: result.recent_window,
            baseline_window: result.baseline_window,
            entities,
            totals,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn window_scale(recent: TimeDelta, baseline: TimeDelta) -> f64 {
    let b = baseline.num_seconds();
    if b <= 0 {
        return 0.0;
    }
    recent.num_seconds() as f64 / b as f64
}

// "24 Hours" / "7-Day"
fn span_name(len: TimeDelta, adjective: bool) -> String {
    let hours = len.num_hours();
    let (n, unit) = if hours >= 48 && hours % 24 == 0 {
        (hours / 24, "Day")
    } else {
        (hours, "Hour")
    };
    if adjective {
        format!("{n}-{unit}")
    } else if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
