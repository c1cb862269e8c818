use std::sync::Arc;
use std::time::Duration;

use insiderwatch_rs::{FilingsFetcher, Pacer, RequestBudget, WindowLabel};

use crate::common::{self, ScriptedSource, Step};

fn one_row(id: &str) -> Step {
    Step::Rows(common::flat_rows(serde_json::json!([{
        "id": id, "company": "AAPL", "insider": "A", "transaction": "buy",
        "shares": 1, "price": 1, "date": "2024-08-26",
        "filed_at": "2024-08-30T12:00:00Z", "form_type": "4"
    }])))
}

#[tokio::test]
async fn concurrent_windows_respect_min_interval() {
    let interval = Duration::from_millis(50);
    // page size 1: each window needs a full page, then an empty one
    let source = Arc::new(
        ScriptedSource::new()
            .with(WindowLabel::Recent, [one_row("r1"), Step::Rows(Vec::new())])
            .with(WindowLabel::Baseline, [one_row("b1"), Step::Rows(Vec::new())]),
    );
    let pacer = Pacer::new(interval);
    let fetcher = FilingsFetcher::new(source.clone(), pacer.clone(), RequestBudget::new(50))
        .page_size(1);

    let started = tokio::time::Instant::now();
    let (recent, baseline, form4) =
        (common::recent_window(), common::baseline_window(), common::form4());
    let (r, b) = tokio::join!(
        fetcher.fetch(&recent, &form4),
        fetcher.fetch(&baseline, &form4),
    );
    let elapsed = started.elapsed();
    assert_eq!(r.unwrap().payloads.len(), 1);
    assert_eq!(b.unwrap().payloads.len(), 1);

    let mut slots = pacer.issued().await;
    slots.sort();
    assert_eq!(slots.len(), 4);
    for pair in slots.windows(2) {
        assert!(pair[1] - pair[0] >= interval, "slots closer than {interval:?}");
    }

    // every request went out no earlier than its reserved slot
    let mut calls: Vec<_> = source.calls().into_iter().map(|(_, at)| at).collect();
    calls.sort();
    assert_eq!(calls.len(), 4);
    for (call, slot) in calls.iter().zip(&slots) {
        assert!(call >= slot);
    }
    assert!(elapsed >= interval * 3);
}
