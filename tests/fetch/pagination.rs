use std::sync::Arc;
use std::time::Duration;

use insiderwatch_rs::{DataSource, FilingsFetcher, Pacer, RequestBudget, WindowLabel};

use crate::common::{self, ScriptedSource, Step};

fn rows(prefix: &str, n: usize) -> Step {
    let items: Vec<_> = (0..n)
        .map(|i| {
            serde_json::json!({
                "id": format!("{prefix}-{i}"), "company": "MSFT", "insider": "B",
                "transaction": "sell", "shares": 5, "price": "400", "date": "2024-08-30",
                "filed_at": "2024-08-30T15:00:00Z", "form_type": "4"
            })
        })
        .collect();
    Step::Rows(common::flat_rows(serde_json::Value::Array(items)))
}

fn fetcher(source: Arc<ScriptedSource>) -> FilingsFetcher {
    FilingsFetcher::new(source, Pacer::new(Duration::ZERO), RequestBudget::new(20))
        .retry_policy(common::fast_retry(0))
        .fallback(common::dataset("filings_aapl_scenario.json"))
        .page_size(2)
        .max_pages(5)
}

#[tokio::test]
async fn pages_until_a_short_page() {
    let source = Arc::new(
        ScriptedSource::new().with(WindowLabel::Recent, [rows("p0", 2), rows("p1", 2), rows("p2", 1)]),
    );

    let out = fetcher(source.clone())
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    assert_eq!(out.source, DataSource::Live);
    assert_eq!(out.payloads.len(), 5);
    assert_eq!(out.attempts, 3);
}

#[tokio::test]
async fn stops_at_max_pages() {
    let source = Arc::new(
        ScriptedSource::new().then_always(WindowLabel::Recent, rows("full", 2)),
    );

    let out = fetcher(source.clone()).max_pages(3)
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    assert_eq!(out.payloads.len(), 6);
    assert_eq!(source.call_count(), 3);
}

#[tokio::test]
async fn a_failing_page_falls_back_for_the_whole_window() {
    let source = Arc::new(
        ScriptedSource::new().with(WindowLabel::Recent, [rows("p0", 2), Step::Fail(502)]),
    );

    let out = fetcher(source.clone())
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    assert!(out.used_fallback());
    // fallback rows only; the live first page is discarded
    assert_eq!(out.payloads.len(), 2);
    assert!(out.payloads.iter().all(|p| matches!(
        insiderwatch_rs::normalize(p).map(|r| r.entity_symbol().to_string()),
        Ok(s) if s == "AAPL"
    )));
}
