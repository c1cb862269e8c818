use std::sync::Arc;

use futures::future::BoxFuture;
use insiderwatch_rs::{
    CancelToken, ChartData, ChartRenderer, IwError, Pipeline, ReportFacts, ReportSynthesizer,
    WindowLabel,
};

use crate::common::{CountingSentiment, ScriptedSource, Step};
use crate::pipeline_end_to_end::config;

struct EchoSynthesizer;

impl ReportSynthesizer for EchoSynthesizer {
    fn synthesize<'a>(
        &'a self,
        text_corpus: &'a str,
        facts: &'a ReportFacts,
    ) -> BoxFuture<'a, Result<String, IwError>> {
        Box::pin(async move { Ok(format!("{} entities\n{text_corpus}", facts.entity_count)) })
    }
}

struct BrokenRenderer;

impl ChartRenderer for BrokenRenderer {
    fn render<'a>(&'a self, _data: &'a ChartData) -> BoxFuture<'a, Result<Vec<u8>, IwError>> {
        Box::pin(async { Err(IwError::Data("renderer offline".into())) })
    }
}

#[tokio::test]
async fn publishing_isolates_collaborator_failures() {
    let source = Arc::new(
        ScriptedSource::new()
            .then_always(WindowLabel::Recent, Step::Fail(503))
            .then_always(WindowLabel::Baseline, Step::Fail(503)),
    );
    let pipeline = Pipeline::new(source, CountingSentiment::serving(Vec::new()))
        .config(config().chart_top_n(3));
    let result = pipeline.run(&CancelToken::new()).await.unwrap();

    let publication = pipeline
        .publish(&result, &EchoSynthesizer, &BrokenRenderer)
        .await;

    assert!(!publication.is_complete());
    assert!(publication.artifact.is_err());
    let report = publication.report.as_ref().unwrap();
    assert!(report.starts_with("6 entities"));
    assert!(report.contains("TSLA"));
    assert!(report.contains("recent window uses sample data"));

    let chart = &publication.chart;
    assert_eq!(chart.recent_label, "Last 24 Hours");
    assert_eq!(chart.baseline_label, "Prior 7-Day Average");
    let symbols: Vec<_> = chart.entities.iter().map(|e| e.entity_symbol.as_str()).collect();
    assert_eq!(symbols, ["TSLA", "GOOGL", "AAPL"]);
    let tsla = &chart.entities[0];
    assert_eq!(tsla.recent_volume, 100_000);
    assert_eq!(tsla.baseline_volume, 80_000);
    assert!((tsla.baseline_average - 80_000.0 / 7.0).abs() < 1e-6);
    assert_eq!(chart.totals.recent_transactions, 6);
    assert_eq!(chart.totals.baseline_transactions, 7);

    let facts = &publication.facts;
    assert_eq!(facts.most_active.len(), 3);
    assert_eq!(facts.recent_shares_bought, 40_000);
    assert_eq!(facts.recent_shares_sold, 180_000);
}
