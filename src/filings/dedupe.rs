use std::collections::HashMap;

use crate::core::{FilingRecord, WindowLabel};

/// Removes duplicate filings by `filing_id`.
///
/// When two records share an id the one with the later `filed_at` wins
/// (an amendment supersedes the original); on a tie the first one seen is
/// kept. The survivor occupies the position of the id's first occurrence,
/// so the relative order of non-conflicting records is unchanged.
#[must_use]
pub fn dedupe(records: Vec<FilingRecord>) -> Vec<FilingRecord> {
    dedupe_with_stats(records).0
}

/// [`dedupe`], also returning how many records were dropped.
#[must_use]
pub fn dedupe_with_stats(records: Vec<FilingRecord>) -> (Vec<FilingRecord>, usize) {
    let (kept, removed) = dedupe_tagged(records.into_iter().map(|r| ((), r)));
    (kept.into_iter().map(|(_, r)| r).collect(), removed)
}

/// Both windows of a run after cross-window deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupedWindows {
    pub recent: Vec<FilingRecord>,
    pub baseline: Vec<FilingRecord>,
    /// Records dropped across both windows.
    pub removed: usize,
}

/// [`dedupe`] over the union of both windows, so a filing id is counted
/// at most once per run.
///
/// Recent records are seen first. Each survivor goes back to the window
/// it was fetched for: an amendment filed in the recent window supersedes
/// its baseline original and is counted as recent activity.
#[must_use]
pub fn dedupe_windows(recent: Vec<FilingRecord>, baseline: Vec<FilingRecord>) -> DedupedWindows {
    let tagged = recent
        .into_iter()
        .map(|r| (WindowLabel::Recent, r))
        .chain(baseline.into_iter().map(|r| (WindowLabel::Baseline, r)));
    let (kept, removed) = dedupe_tagged(tagged);

    let mut out = DedupedWindows {
        removed,
        ..DedupedWindows::default()
    };
    for (label, rec) in kept {
        match label {
            WindowLabel::Recent => out.recent.push(rec),
            WindowLabel::Baseline => out.baseline.push(rec),
        }
    }
    out
}

fn dedupe_tagged<T>(
    records: impl IntoIterator<Item = (T, FilingRecord)>,
) -> (Vec<(T, FilingRecord)>, usize) {
    let mut slot_of: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<(T, FilingRecord)> = Vec::new();
    let mut removed = 0;

    for (tag, rec) in records {
        match slot_of.get(rec.filing_id()) {
            Some(&i) => {
                if rec.filed_at() > kept[i].1.filed_at() {
                    kept[i] = (tag, rec);
                }
                removed += 1;
            }
            None => {
                slot_of.insert(rec.filing_id().to_string(), kept.len());
                kept.push((tag, rec));
            }
        }
    }

    (kept, removed)
}
