use std::sync::Arc;
use std::time::Duration;

use insiderwatch_rs::{FilingsFetcher, Pacer, RequestBudget, WindowLabel};

use crate::common::{self, ScriptedSource, Step};

#[tokio::test]
async fn exhausted_budget_short_circuits_to_fallback() {
    let source = Arc::new(
        ScriptedSource::new()
            .then_always(WindowLabel::Recent, Step::Fail(503))
            .then_always(WindowLabel::Baseline, Step::Fail(503)),
    );
    let budget = RequestBudget::new(2);
    let fetcher = FilingsFetcher::new(source.clone(), Pacer::new(Duration::ZERO), budget.clone())
        .retry_policy(common::fast_retry(5))
        .fallback(common::dataset("filings_aapl_scenario.json"));

    let recent = fetcher
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();
    assert!(recent.used_fallback());
    assert!(recent.budget_exhausted);
    assert_eq!(recent.attempts, 2);
    assert!(budget.is_exhausted());

    // nothing left for the second window: no request at all
    let baseline = fetcher
        .fetch(&common::baseline_window(), &common::form4())
        .await
        .unwrap();
    assert!(baseline.used_fallback());
    assert!(baseline.budget_exhausted);
    assert_eq!(baseline.attempts, 0);
    assert_eq!(
        baseline.fallback_reason.as_deref(),
        Some("request budget of 2 exhausted")
    );
    assert_eq!(source.call_count(), 2);
    assert_eq!(budget.used(), 2);
}

#[tokio::test]
async fn budget_is_shared_by_concurrent_windows() {
    let source = Arc::new(
        ScriptedSource::new()
            .then_always(WindowLabel::Recent, Step::Fail(500))
            .then_always(WindowLabel::Baseline, Step::Fail(500)),
    );
    let fetcher = FilingsFetcher::new(
        source.clone(),
        Pacer::new(Duration::from_millis(1)),
        RequestBudget::new(5),
    )
    .retry_policy(common::fast_retry(10));

    let (recent, baseline, form4) =
        (common::recent_window(), common::baseline_window(), common::form4());
    let (r, b) = tokio::join!(
        fetcher.fetch(&recent, &form4),
        fetcher.fetch(&baseline, &form4),
    );
    let (r, b) = (r.unwrap(), b.unwrap());

    assert_eq!(r.attempts + b.attempts, 5);
    assert_eq!(source.call_count(), 5);
    assert!(r.budget_exhausted || b.budget_exhausted);
}
