use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::core::WindowLabel;

/// A transformation step of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Normalizing,
    Deduplicating,
    Comparing,
    Correlating,
}

impl Stage {
    /// Every stage, in the order a run executes them.
    pub const ALL: [Self; 5] = [
        Self::Fetching,
        Self::Normalizing,
        Self::Deduplicating,
        Self::Comparing,
        Self::Correlating,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Normalizing => "normalizing",
            Self::Deduplicating => "deduplicating",
            Self::Comparing => "comparing",
            Self::Correlating => "correlating",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stage a failed run stopped in, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub cause: String,
}

/// Everything a run observed about its own health.
///
/// Populated stage by stage; a cancelled or failed run returns whatever had
/// been recorded up to that point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunDiagnostics {
    /// Raw payloads received per window, live or fallback.
    pub records_fetched: BTreeMap<WindowLabel, usize>,
    pub duplicates_removed: usize,
    pub rejected_count: usize,
    /// Rejections per reason kind.
    pub rejections: BTreeMap<String, usize>,
    pub used_fallback: BTreeMap<WindowLabel, bool>,
    pub fallback_reasons: BTreeMap<WindowLabel, String>,
    /// Outbound requests across both windows, retries included.
    pub requests_issued: u32,
    pub budget_exhausted: bool,
    /// The sentiment provider failed and every entity was scored neutral.
    pub sentiment_unavailable: bool,
    pub stages_completed: Vec<Stage>,
    pub failure: Option<StageFailure>,
}

impl RunDiagnostics {
    /// Whether any window was served from fallback data.
    #[must_use]
    pub fn any_fallback(&self) -> bool {
        self.used_fallback.values().any(|v| *v)
    }

    /// Whether the run completed on degraded inputs.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.any_fallback()
            || self.rejected_count > 0
            || self.budget_exhausted
            || self.sentiment_unavailable
    }
}
