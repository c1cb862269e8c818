use std::sync::Arc;
use std::time::Duration;

use httpmock::Method::POST;
use insiderwatch_rs::core::PageRequest;
use insiderwatch_rs::{
    DataSource, FilingSource, FilingsFetcher, InsiderRole, IwClient, IwError, Pacer,
    RequestBudget, TransactionType, normalize,
};
use serde_json::json;

use crate::common;

fn client(server: &httpmock::MockServer) -> IwClient {
    IwClient::builder()
        .base_filings(common::base_url(server))
        .app_name("insiderwatch-test")
        .contact("ops@example.com")
        .api_key("test-key")
        .build()
        .unwrap()
}

#[tokio::test]
async fn live_query_carries_identification_and_parses_filings() {
    let server = common::setup_server();
    let expected = json!({
        "query": "formType:(4) AND filedAt:[2024-08-29T20:00:00Z TO 2024-08-30T20:00:00Z]",
        "from": "0",
        "size": "200",
        "sort": [{ "filedAt": { "order": "desc" } }],
    });
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/insider-trading")
            .header("user-agent", "insiderwatch-test ops@example.com")
            .header("authorization", "test-key")
            .json_body(expected);
        then.status(200)
            .header("content-type", "application/json")
            .body(common::fixture("filings_recent_query.json"));
    });

    let fetcher = FilingsFetcher::new(
        Arc::new(client(&server)),
        Pacer::new(Duration::ZERO),
        RequestBudget::new(10),
    );
    let out = fetcher
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap();

    mock.assert();
    assert_eq!(out.source, DataSource::Live);
    assert_eq!(out.payloads.len(), 3);

    let records: Vec<_> = out.payloads.iter().map(|p| normalize(p).unwrap()).collect();
    assert_eq!(records[0].entity_symbol(), "AAPL");
    assert_eq!(records[0].transaction_type(), TransactionType::Sell);
    assert_eq!(records[0].insider_role(), InsiderRole::Executive);
    assert_eq!(records[1].shares(), 1_500);
    assert_eq!(records[1].insider_role(), InsiderRole::Director);
    assert_eq!(records[2].entity_symbol(), "MSFT");
    assert_eq!(records[2].transaction_type(), TransactionType::Other);
    assert_eq!(records[2].shares(), 12_000);
}

#[tokio::test]
async fn missing_contact_sends_nothing() {
    let server = common::setup_server();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/insider-trading");
        then.status(200).body("{}");
    });

    let client = IwClient::builder()
        .base_filings(common::base_url(&server))
        .build()
        .unwrap();
    let fetcher = FilingsFetcher::new(
        Arc::new(client),
        Pacer::new(Duration::ZERO),
        RequestBudget::new(10),
    );
    let err = fetcher
        .fetch(&common::recent_window(), &common::form4())
        .await
        .unwrap_err();

    assert!(matches!(err, IwError::Config(_)), "got {err:?}");
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn statuses_map_to_error_variants() {
    let window = common::recent_window();
    let forms = common::form4();

    let cases: [(u16, fn(&IwError) -> bool); 6] = [
        (401, |e| matches!(e, IwError::Auth(_))),
        (403, |e| matches!(e, IwError::Auth(_))),
        (404, |e| matches!(e, IwError::NotFound { .. })),
        (429, |e| matches!(e, IwError::RateLimited { .. })),
        (503, |e| matches!(e, IwError::ServerError { status: 503, .. })),
        (418, |e| matches!(e, IwError::Status { status: 418, .. })),
    ];
    for (status, check) in cases {
        let server = common::setup_server();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/insider-trading");
            then.status(status).body("{}");
        });

        let req = PageRequest {
            window: &window,
            form_types: &forms,
            universe: None,
            from: 0,
            size: 50,
        };
        let err = client(&server).query_page(req).await.unwrap_err();

        mock.assert();
        assert!(check(&err), "status {status} mapped to {err:?}");
    }
}

#[tokio::test]
async fn undecodable_body_is_a_data_error() {
    let server = common::setup_server();
    server.mock(|when, then| {
        when.method(POST).path("/insider-trading");
        then.status(200)
            .header("content-type", "application/json")
            .body(common::fixture("filings_malformed.json"));
    });

    let window = common::recent_window();
    let forms = common::form4();
    let req = PageRequest {
        window: &window,
        form_types: &forms,
        universe: None,
        from: 0,
        size: 50,
    };
    let err = client(&server).query_page(req).await.unwrap_err();
    assert!(matches!(err, IwError::Data(_)), "got {err:?}");
}
