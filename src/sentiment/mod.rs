//! Market sentiment merged onto the compared entities.

mod model;

pub use model::{
    CombinedSentiment, SentimentLabel, SentimentScore, SentimentSource, SignalAlignment,
    SourceSentiment,
};

use std::collections::{BTreeMap, HashMap};

use futures::future::BoxFuture;

use crate::compare::ComparisonResult;
use crate::core::{IwError, SentimentProvider};

#[derive(Default, Clone, Copy)]
struct Accum {
    weighted: f64,
    samples: u64,
}

impl Accum {
    fn add(&mut self, polarity: f64, samples: u32) {
        self.weighted += polarity * f64::from(samples);
        self.samples += u64::from(samples);
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean(self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.weighted / self.samples as f64
        }
    }
}

/// Merges `scores` onto every entity in `comparisons`.
///
/// Polarities are averaged weighted by sample count, per source and overall.
/// Entities without usable scores get [`CombinedSentiment::neutral`]; scores
/// for entities not in `comparisons` are ignored. NaN and infinite polarities
/// are discarded and out-of-range ones clamped to `[-1, 1]`.
#[must_use]
pub fn correlate(
    scores: &[SentimentScore],
    comparisons: &BTreeMap<String, ComparisonResult>,
) -> BTreeMap<String, CombinedSentiment> {
    let mut per_entity: HashMap<String, BTreeMap<SentimentSource, Accum>> = HashMap::new();

    for s in scores {
        if !s.polarity.is_finite() {
            #[cfg(feature = "tracing")]
            tracing::debug!(symbol = %s.entity_symbol, source = %s.source, "discarding non-finite polarity");
            continue;
        }
        let symbol = s.entity_symbol.trim().to_ascii_uppercase();
        if !comparisons.contains_key(&symbol) {
            continue;
        }
        per_entity
            .entry(symbol)
            .or_default()
            .entry(s.source)
            .or_default()
            .add(s.polarity.clamp(-1.0, 1.0), s.sample_count);
    }

    comparisons
        .keys()
        .map(|symbol| {
            let combined = match per_entity.remove(symbol) {
                None => CombinedSentiment::neutral(symbol.as_str()),
                Some(sources) => {
                    let mut total = Accum::default();
                    let mut by_source = BTreeMap::new();
                    for (source, acc) in sources {
                        total.weighted += acc.weighted;
                        total.samples += acc.samples;
                        by_source.insert(
                            source,
                            SourceSentiment {
                                polarity: acc.mean(),
                                sample_count: acc.samples,
                            },
                        );
                    }
                    let polarity = total.mean();
                    CombinedSentiment {
                        entity_symbol: symbol.clone(),
                        polarity,
                        sample_count: total.samples,
                        label: SentimentLabel::from_polarity(polarity),
                        by_source,
                    }
                }
            };
            (symbol.clone(), combined)
        })
        .collect()
}

/// In-memory provider serving a fixed set of scores.
#[derive(Debug, Clone, Default)]
pub struct StaticSentiment {
    scores: Vec<SentimentScore>,
}

impl StaticSentiment {
    #[must_use]
    pub fn new(scores: Vec<SentimentScore>) -> Self {
        Self { scores }
    }
}

impl SentimentProvider for StaticSentiment {
    fn get_sentiment<'a>(
        &'a self,
        entity_symbols: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<SentimentScore>, IwError>> {
        Box::pin(async move {
            Ok(self
                .scores
                .iter()
                .filter(|s| {
                    entity_symbols
                        .iter()
                        .any(|e| e.eq_ignore_ascii_case(s.entity_symbol.trim()))
                })
                .cloned()
                .collect())
        })
    }
}
