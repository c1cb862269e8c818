use std::sync::Arc;
use std::time::Duration;

use insiderwatch_rs::{
    Backoff, DataSource, FilingsFetcher, IwError, Pacer, RequestBudget, RetryConfig, WindowLabel,
};

use crate::common::{self, ScriptedSource, Step};

fn fetcher(source: Arc<ScriptedSource>, retry: RetryConfig) -> FilingsFetcher {
    FilingsFetcher::new(source, Pacer::new(Duration::ZERO), RequestBudget::new(100))
        .retry_policy(retry)
        .fallback(common::dataset("filings_aapl_scenario.json"))
}

fn aapl_row(id: &str) -> Vec<insiderwatch_rs::RawPayload> {
    common::flat_rows(serde_json::json!([{
        "id": id, "company": "AAPL", "insider": "Tim Cook", "transaction": "buy",
        "shares": 10, "price": 1, "date": "2024-08-30",
        "filed_at": "2024-08-30T12:00:00Z", "form_type": "4"
    }]))
}

#[tokio::test]
async fn transient_failures_below_ceiling_recover_live() {
    let max_retries = 3;
    let source = Arc::new(
        ScriptedSource::new()
            .with(WindowLabel::Recent, (0..max_retries).map(|_| Step::Fail(503)))
            .with(WindowLabel::Recent, [Step::Rows(aapl_row("live-1"))]),
    );

    let out = fetcher(source.clone(), common::fast_retry(max_retries))
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    assert_eq!(out.source, DataSource::Live);
    assert!(out.fallback_reason.is_none());
    assert_eq!(out.attempts, max_retries + 1);
    assert_eq!(out.payloads.len(), 1);
    assert_eq!(source.call_count(), (max_retries + 1) as usize);
}

#[tokio::test]
async fn failures_at_ceiling_fall_back() {
    let max_retries = 3;
    let source = Arc::new(
        ScriptedSource::new()
            .with(WindowLabel::Recent, (0..=max_retries).map(|_| Step::Fail(429)))
            .with(WindowLabel::Recent, [Step::Rows(aapl_row("never-seen"))]),
    );

    let out = fetcher(source.clone(), common::fast_retry(max_retries))
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    assert!(out.used_fallback());
    assert_eq!(out.attempts, max_retries + 1);
    assert!(out.fallback_reason.as_deref().unwrap().contains("rate limited"));
    // the two recent rows of the fallback fixture
    assert_eq!(out.payloads.len(), 2);
    assert_eq!(source.call_count(), (max_retries + 1) as usize);
}

#[tokio::test]
async fn non_transient_status_is_not_retried() {
    let source = Arc::new(ScriptedSource::new().with(WindowLabel::Baseline, [Step::Fail(400)]));

    let out = fetcher(source.clone(), common::fast_retry(4))
        .fetch(&common::baseline_window(), &common::form4())
        .await
        .unwrap();

    assert!(out.used_fallback());
    assert_eq!(out.attempts, 1);
    assert_eq!(out.payloads.len(), 1);
}

#[tokio::test]
async fn rejected_credentials_abort() {
    let source = Arc::new(ScriptedSource::new().with(WindowLabel::Recent, [Step::Fail(401)]));

    let err = fetcher(source.clone(), common::fast_retry(4))
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap_err();

    assert!(matches!(err, IwError::Auth(_)), "got {err:?}");
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn cumulative_backoff_is_capped() {
    let source = Arc::new(
        ScriptedSource::new().then_always(WindowLabel::Recent, Step::Fail(503)),
    );
    let retry = RetryConfig {
        max_retries: 10,
        backoff: Backoff::Fixed(Duration::from_millis(50)),
        max_total_backoff: Duration::from_millis(120),
        ..RetryConfig::default()
    };

    let out = fetcher(source.clone(), retry)
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    // 50ms + 50ms fit under the ceiling, a third sleep would not
    assert!(out.used_fallback());
    assert_eq!(out.attempts, 3);
    assert!(out.fallback_reason.unwrap().contains("backoff ceiling"));
}

#[tokio::test]
async fn hung_requests_time_out_and_fall_back() {
    let source = Arc::new(ScriptedSource::new().then_always(WindowLabel::Recent, Step::Hang));

    let started = std::time::Instant::now();
    let out = fetcher(source.clone(), common::fast_retry(1))
        .request_timeout(Duration::from_millis(20))
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    assert!(out.used_fallback());
    assert_eq!(out.attempts, 2);
    assert!(out.fallback_reason.unwrap().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn missing_identification_fails_before_any_request() {
    let source = Arc::new(ScriptedSource::new().misconfigured("no contact"));

    let err = fetcher(source.clone(), common::fast_retry(4))
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap_err();

    assert!(err.is_config());
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn fallback_keeps_only_requested_forms() {
    let rows = common::flat_rows(serde_json::json!([
        {"id": "fb-4", "company": "AAPL", "insider": "A", "transaction": "buy",
         "shares": 10, "price": 1, "date": "2024-08-30",
         "filed_at": "2024-08-30T12:00:00Z", "form_type": "4"},
        {"id": "fb-5", "company": "AAPL", "insider": "B", "transaction": "buy",
         "shares": 10, "price": 1, "date": "2024-08-30",
         "filed_at": "2024-08-30T12:00:00Z", "form_type": "5"}
    ]));
    let source = Arc::new(ScriptedSource::new().then_always(WindowLabel::Recent, Step::Fail(400)));
    let out = FilingsFetcher::new(source, Pacer::new(Duration::ZERO), RequestBudget::new(10))
        .fallback(insiderwatch_rs::FallbackDataset::new(rows, Vec::new()))
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    assert!(out.used_fallback());
    let batch = insiderwatch_rs::filings::normalize_batch(&out.payloads);
    let ids: Vec<_> = batch.records.iter().map(|r| r.filing_id()).collect();
    assert_eq!(ids, ["fb-4"]);
}
