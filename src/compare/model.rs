use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::WindowLabel;

/// Per-entity rollup of one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityAggregate {
    pub entity_symbol: String,
    pub window_label: WindowLabel,
    /// Shares acquired through open-market purchases.
    pub total_shares_bought: u64,
    /// Shares disposed of through open-market sales.
    pub total_shares_sold: u64,
    /// Every transaction, whatever its type.
    pub transaction_count: u64,
    /// Distinct insider names.
    pub distinct_insiders: u64,
    /// Shares × price over purchases.
    pub total_value_bought: Decimal,
    /// Shares × price over sales.
    pub total_value_sold: Decimal,
}

impl EntityAggregate {
    /// An aggregate with no activity.
    #[must_use]
    pub fn empty(entity_symbol: impl Into<String>, window_label: WindowLabel) -> Self {
        Self {
            entity_symbol: entity_symbol.into(),
            window_label,
            total_shares_bought: 0,
            total_shares_sold: 0,
            transaction_count: 0,
            distinct_insiders: 0,
            total_value_bought: Decimal::ZERO,
            total_value_sold: Decimal::ZERO,
        }
    }

    /// Bought + sold shares (saturating).
    #[must_use]
    pub const fn total_volume(&self) -> u64 {
        self.total_shares_bought.saturating_add(self.total_shares_sold)
    }

    /// Bought − sold shares.
    #[must_use]
    pub fn net_shares(&self) -> i128 {
        i128::from(self.total_shares_bought) - i128::from(self.total_shares_sold)
    }
}

/// Recent volume relative to baseline volume.
///
/// The sentinels are variants rather than special floats, so consumers
/// cannot use them as numbers by accident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VolumeRatio {
    /// `recent / baseline` with a nonzero baseline.
    Numeric(f64),
    /// Zero baseline, nonzero recent activity.
    NewActivity,
    /// Zero volume in both windows.
    NoActivity,
}

impl VolumeRatio {
    /// Derives the ratio from two volumes.
    #[must_use]
    pub fn from_volumes(recent: u64, baseline: u64) -> Self {
        match (recent, baseline) {
            (0, 0) => Self::NoActivity,
            (_, 0) => Self::NewActivity,
            #[allow(clippy::cast_precision_loss)]
            (r, b) => Self::Numeric(r as f64 / b as f64),
        }
    }

    /// The numeric value, if this is not a sentinel.
    #[must_use]
    pub const fn as_f64(self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(v),
            Self::NewActivity | Self::NoActivity => None,
        }
    }
}

/// Recent and baseline aggregates for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub entity_symbol: String,
    pub recent: EntityAggregate,
    pub baseline: EntityAggregate,
    /// Recent volume minus baseline volume.
    pub volume_delta: i64,
    pub volume_ratio: VolumeRatio,
}
