use chrono::SecondsFormat;
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::json;

use super::wire::QueryEnvelope;
use crate::core::{FilingSource, IwClient, IwError, Page, PageRequest, net};

/// Lucene-style query understood by the filing query API.
pub(crate) fn build_query(req: &PageRequest<'_>) -> String {
    let forms = req
        .form_types
        .iter()
        .map(|f| f.code())
        .collect::<Vec<_>>()
        .join(" OR ");
    let mut q = format!(
        "formType:({forms}) AND filedAt:[{} TO {}]",
        req.window.start().to_rfc3339_opts(SecondsFormat::Secs, true),
        req.window.end().to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    if let Some(universe) = req.universe.filter(|u| !u.is_empty()) {
        let symbols = universe.iter().cloned().collect::<Vec<_>>().join(" OR ");
        q.push_str(&format!(" AND issuer.tradingSymbol:({symbols})"));
    }
    q
}

async fn query_page(client: &IwClient, req: PageRequest<'_>) -> Result<Page, IwError> {
    let ident = client.identification()?;
    let url = client.filings_url()?;

    let body = json!({
        "query": build_query(&req),
        "from": req.from.to_string(),
        "size": req.size.to_string(),
        "sort": [{ "filedAt": { "order": "desc" } }],
    });

    let mut rb = client
        .http()
        .post(url.clone())
        .header(USER_AGENT, ident)
        .header(ACCEPT, "application/json")
        .json(&body);
    if let Some(key) = client.api_key() {
        rb = rb.header(AUTHORIZATION, key);
    }

    let resp = rb.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(IwError::from_status(status.as_u16(), url.as_str()));
    }

    let key = format!(
        "{}_{}",
        req.window.label(),
        req.window.start().format("%Y%m%dT%H%M")
    );
    let text = net::get_text(resp, "filings", &key, "json").await?;
    let env: QueryEnvelope = serde_json::from_str(&text)
        .map_err(|e| IwError::Data(format!("filing query response: {e}")))?;

    Ok(Page {
        payloads: env.transactions.unwrap_or_default(),
        total: env.total.as_ref().and_then(|t| t.value()),
    })
}

impl FilingSource for IwClient {
    fn validate(&self) -> Result<(), IwError> {
        self.identification().map(|_| ())
    }

    fn query_page<'a>(&'a self, req: PageRequest<'a>) -> BoxFuture<'a, Result<Page, IwError>> {
        Box::pin(query_page(self, req))
    }
}
