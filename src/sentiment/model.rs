use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Channel a sentiment score was measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentSource {
    News,
    Social,
    Video,
}

impl fmt::Display for SentimentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::News => "news",
            Self::Social => "social",
            Self::Video => "video",
        })
    }
}

/// One provider's reading for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub entity_symbol: String,
    pub source: SentimentSource,
    /// In `[-1, 1]`.
    pub polarity: f64,
    /// Observations behind `polarity`; the weight of this score.
    pub sample_count: u32,
}

impl SentimentScore {
    pub fn new(
        entity_symbol: impl Into<String>,
        source: SentimentSource,
        polarity: f64,
        sample_count: u32,
    ) -> Self {
        Self {
            entity_symbol: entity_symbol.into(),
            source,
            polarity,
            sample_count,
        }
    }
}

/// Coarse reading of a polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// `>= 0.1` is positive, `<= -0.1` negative, anything between neutral.
    #[must_use]
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity >= 0.1 {
            Self::Positive
        } else if polarity <= -0.1 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        })
    }
}

/// Weighted reading of a single source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceSentiment {
    pub polarity: f64,
    pub sample_count: u64,
}

/// Sentiment for one entity, merged across sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedSentiment {
    pub entity_symbol: String,
    /// Sample-weighted mean polarity; `0.0` without samples.
    pub polarity: f64,
    pub sample_count: u64,
    pub label: SentimentLabel,
    pub by_source: BTreeMap<SentimentSource, SourceSentiment>,
}

impl CombinedSentiment {
    /// The reading of an entity nobody had data on.
    #[must_use]
    pub fn neutral(entity_symbol: impl Into<String>) -> Self {
        Self {
            entity_symbol: entity_symbol.into(),
            polarity: 0.0,
            sample_count: 0,
            label: SentimentLabel::Neutral,
            by_source: BTreeMap::new(),
        }
    }
}

/// Whether insider trading direction agrees with market sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAlignment {
    /// Net buying with positive sentiment, or net selling with negative.
    Confirming,
    /// Net buying with negative sentiment, or net selling with positive.
    Diverging,
    /// Neutral sentiment or no net direction.
    Inconclusive,
}

impl SignalAlignment {
    /// Compares the sign of `net_shares` (bought minus sold) with `label`.
    #[must_use]
    pub fn from_signals(net_shares: i128, label: SentimentLabel) -> Self {
        match (net_shares.signum(), label) {
            (1, SentimentLabel::Positive) | (-1, SentimentLabel::Negative) => Self::Confirming,
            (1, SentimentLabel::Negative) | (-1, SentimentLabel::Positive) => Self::Diverging,
            _ => Self::Inconclusive,
        }
    }
}
