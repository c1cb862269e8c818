//! Recent-versus-baseline comparison of insider activity per entity.

mod model;

pub use model::{ComparisonResult, EntityAggregate, VolumeRatio};

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::core::{FilingRecord, IwError, TransactionType, WindowLabel};

fn overflow(what: &str, symbol: &str) -> IwError {
    IwError::Data(format!("{what} overflow for {symbol}"))
}

/// Rolls `records` up per entity for one window.
///
/// # Errors
///
/// Returns [`IwError::Data`] if a share or value total overflows.
pub fn aggregate(
    records: &[FilingRecord],
    label: WindowLabel,
) -> Result<BTreeMap<String, EntityAggregate>, IwError> {
    let mut out: BTreeMap<String, EntityAggregate> = BTreeMap::new();
    let mut insiders: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();

    for rec in records {
        let symbol = rec.entity_symbol();
        let agg = out
            .entry(symbol.to_string())
            .or_insert_with(|| EntityAggregate::empty(symbol, label));

        match rec.transaction_type() {
            TransactionType::Buy => {
                agg.total_shares_bought = agg
                    .total_shares_bought
                    .checked_add(rec.shares())
                    .ok_or_else(|| overflow("bought shares", symbol))?;
                agg.total_value_bought = rec
                    .value()
                    .and_then(|v| agg.total_value_bought.checked_add(v))
                    .ok_or_else(|| overflow("bought value", symbol))?;
            }
            TransactionType::Sell => {
                agg.total_shares_sold = agg
                    .total_shares_sold
                    .checked_add(rec.shares())
                    .ok_or_else(|| overflow("sold shares", symbol))?;
                agg.total_value_sold = rec
                    .value()
                    .and_then(|v| agg.total_value_sold.checked_add(v))
                    .ok_or_else(|| overflow("sold value", symbol))?;
            }
            TransactionType::Grant | TransactionType::Other => {}
        }
        agg.transaction_count += 1;
        insiders
            .entry(symbol)
            .or_default()
            .insert(rec.insider_name());
    }

    for (symbol, names) in insiders {
        if let Some(agg) = out.get_mut(symbol) {
            agg.distinct_insiders = names.len() as u64;
        }
    }
    Ok(out)
}

/// Compares per-entity activity between the recent and baseline windows.
///
/// Every entity seen in either window gets a result; the window it is
/// missing from contributes a zeroed aggregate.
///
/// # Errors
///
/// Returns [`IwError::Data`] if share totals overflow.
pub fn compare(
    recent: &[FilingRecord],
    baseline: &[FilingRecord],
) -> Result<BTreeMap<String, ComparisonResult>, IwError> {
    let mut recent_aggs = aggregate(recent, WindowLabel::Recent)?;
    let mut baseline_aggs = aggregate(baseline, WindowLabel::Baseline)?;

    let symbols: Vec<String> = recent_aggs
        .keys()
        .chain(baseline_aggs.keys())
        .cloned()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut out = BTreeMap::new();
    for symbol in symbols {
        let r = recent_aggs
            .remove(&symbol)
            .unwrap_or_else(|| EntityAggregate::empty(&symbol, WindowLabel::Recent));
        let b = baseline_aggs
            .remove(&symbol)
            .unwrap_or_else(|| EntityAggregate::empty(&symbol, WindowLabel::Baseline));

        let rv = r
            .total_shares_bought
            .checked_add(r.total_shares_sold)
            .ok_or_else(|| overflow("recent volume", &symbol))?;
        let bv = b
            .total_shares_bought
            .checked_add(b.total_shares_sold)
            .ok_or_else(|| overflow("baseline volume", &symbol))?;
        let volume_delta = i64::try_from(i128::from(rv) - i128::from(bv))
            .map_err(|_| overflow("volume delta", &symbol))?;

        out.insert(
            symbol.clone(),
            ComparisonResult {
                entity_symbol: symbol,
                recent: r,
                baseline: b,
                volume_delta,
                volume_ratio: VolumeRatio::from_volumes(rv, bv),
            },
        );
    }
    Ok(out)
}

/// Ranking order: `volume_delta` descending, then `entity_symbol` ascending.
#[must_use]
pub fn ranking_order(a: &ComparisonResult, b: &ComparisonResult) -> Ordering {
    b.volume_delta
        .cmp(&a.volume_delta)
        .then_with(|| a.entity_symbol.cmp(&b.entity_symbol))
}

/// Results in ranking order.
#[must_use]
pub fn rank(results: &BTreeMap<String, ComparisonResult>) -> Vec<&ComparisonResult> {
    let mut v: Vec<_> = results.values().collect();
    v.sort_by(|a, b| ranking_order(a, b));
    v
}
