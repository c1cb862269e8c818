use std::sync::Arc;

use insiderwatch_rs::{
    CancelToken, Pipeline, SentimentLabel, SentimentScore, SentimentSource, StaticSentiment,
    WindowLabel,
};
use serde_json::json;

use crate::common::{self, CountingSentiment, ScriptedSource, Step};
use crate::pipeline_end_to_end::config;

#[tokio::test]
async fn bad_and_duplicate_records_are_absorbed() {
    let recent = common::flat_rows(json!([
        {"id": "x-1", "company": "MSFT", "insider": "A", "transaction": "sell", "shares": 100,
         "price": "410", "date": "2024-08-29", "filed_at": "2024-08-29T21:00:00Z", "form_type": "4"},
        // amendment of x-1, filed later: supersedes it
        {"id": "x-1", "company": "MSFT", "insider": "A", "transaction": "sell", "shares": 150,
         "price": "410", "date": "2024-08-29", "filed_at": "2024-08-30T13:00:00Z", "form_type": "4/A"},
        {"id": "x-2", "company": "MSFT", "transaction": "buy", "shares": 10,
         "price": "405", "date": "2024-08-29", "filed_at": "2024-08-30T13:00:00Z", "form_type": "4"},
        {"id": "x-3", "company": "MSFT", "insider": "C", "transaction": "buy", "shares": -3,
         "price": "405", "date": "2024-08-29", "filed_at": "2024-08-30T13:00:00Z", "form_type": "4"},
        [1, 2, 3]
    ]));
    let source = Arc::new(ScriptedSource::new().with(WindowLabel::Recent, [Step::Rows(recent)]));

    let result = Pipeline::new(source, CountingSentiment::serving(Vec::new()))
        .config(config())
        .run(&CancelToken::new())
        .await
        .unwrap();

    let d = &result.diagnostics;
    assert_eq!(d.records_fetched[&WindowLabel::Recent], 5);
    assert_eq!(d.rejected_count, 3);
    assert_eq!(d.rejections["missing_field"], 1);
    assert_eq!(d.rejections["negative_value"], 1);
    assert_eq!(d.rejections["unrecognized"], 1);
    assert_eq!(d.duplicates_removed, 1);
    assert!(d.is_degraded());
    assert!(!d.any_fallback());

    let msft = &result.entities["MSFT"].comparison;
    assert_eq!(msft.recent.total_shares_sold, 150);
    assert_eq!(msft.recent.transaction_count, 1);
}

#[tokio::test]
async fn filings_seen_by_both_windows_are_counted_once() {
    // filed exactly on the window boundary, so both window queries return it
    let boundary = json!({"id": "dup-1", "company": "AAPL", "insider": "A", "transaction": "buy",
        "shares": 100, "price": "220", "date": "2024-08-29",
        "filed_at": "2024-08-29T20:00:00Z", "form_type": "4"});
    let recent = common::flat_rows(json!([
        boundary.clone(),
        // amendment of an original that landed in the baseline window
        {"id": "amend-1", "company": "MSFT", "insider": "B", "transaction": "sell", "shares": 80,
         "price": "410", "date": "2024-08-26", "filed_at": "2024-08-30T10:00:00Z", "form_type": "4/A"}
    ]));
    let baseline = common::flat_rows(json!([
        {"id": "amend-1", "company": "MSFT", "insider": "B", "transaction": "sell", "shares": 50,
         "price": "410", "date": "2024-08-26", "filed_at": "2024-08-27T10:00:00Z", "form_type": "4"},
        boundary
    ]));
    let source = Arc::new(
        ScriptedSource::new()
            .with(WindowLabel::Recent, [Step::Rows(recent)])
            .with(WindowLabel::Baseline, [Step::Rows(baseline)]),
    );

    let result = Pipeline::new(source, CountingSentiment::serving(Vec::new()))
        .config(config())
        .run(&CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.diagnostics.duplicates_removed, 2);

    let aapl = &result.entities["AAPL"].comparison;
    assert_eq!(aapl.recent.total_shares_bought, 100);
    assert_eq!(aapl.baseline.total_shares_bought, 0);
    assert_eq!(aapl.volume_delta, 100);

    let msft = &result.entities["MSFT"].comparison;
    assert_eq!(msft.recent.total_shares_sold, 80);
    assert_eq!(msft.baseline.transaction_count, 0);
}

#[tokio::test]
async fn failing_sentiment_provider_scores_neutral() {
    let source = Arc::new(
        ScriptedSource::new().with(
            WindowLabel::Recent,
            [Step::Rows(crate::pipeline_end_to_end::scenario(WindowLabel::Recent))],
        ),
    );
    let sentiment = CountingSentiment::failing();

    let result = Pipeline::new(source, sentiment.clone())
        .config(config())
        .run(&CancelToken::new())
        .await
        .unwrap();

    assert_eq!(sentiment.call_count(), 1);
    assert!(result.diagnostics.sentiment_unavailable);
    let aapl = &result.entities["AAPL"].sentiment;
    assert_eq!(aapl.polarity, 0.0);
    assert_eq!(aapl.sample_count, 0);
    assert_eq!(aapl.label, SentimentLabel::Neutral);
}

#[tokio::test]
async fn universe_scopes_fallback_and_sentiment() {
    let source = Arc::new(
        ScriptedSource::new()
            .then_always(WindowLabel::Recent, Step::Fail(500))
            .then_always(WindowLabel::Baseline, Step::Fail(500)),
    );
    let sentiment = Arc::new(StaticSentiment::new(vec![
        SentimentScore::new("aapl", SentimentSource::Video, -0.6, 4),
        SentimentScore::new("TSLA", SentimentSource::News, 0.9, 100),
    ]));

    let result = Pipeline::new(source, sentiment)
        .config(config().universe(["aapl"]))
        .run(&CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.entities.keys().collect::<Vec<_>>(), ["AAPL"]);
    let aapl = &result.entities["AAPL"];
    assert_eq!(aapl.comparison.recent.total_shares_sold, 50_000);
    assert_eq!(aapl.comparison.baseline.total_shares_sold, 52_000);
    assert_eq!(aapl.comparison.baseline.distinct_insiders, 2);
    assert_eq!(aapl.sentiment.label, SentimentLabel::Negative);
    assert_eq!(
        aapl.alignment,
        insiderwatch_rs::SignalAlignment::Confirming,
        "net selling with negative sentiment"
    );
}
