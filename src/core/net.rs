#[cfg(feature = "test-mode")]
use std::env;

/// Read the response body as text.
/// In `test-mode`, if `IW_RECORD=1`, the body is saved as a fixture via `core::fixtures`.
pub(crate) async fn get_text(
    resp: reqwest::Response,
    _endpoint: &str,
    _key: &str,
    _ext: &str,
) -> Result<String, reqwest::Error> {
    let text = resp.text().await?;

    #[cfg(feature = "test-mode")]
    {
        if env::var("IW_RECORD").ok().as_deref() == Some("1")
            && let Err(e) = crate::core::fixtures::record_fixture(_endpoint, _key, _ext, &text)
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(key = _key, error = %e, "IW_RECORD: failed to write fixture");
            #[cfg(not(feature = "tracing"))]
            eprintln!("IW_RECORD: failed to write fixture for {_key}: {e}");
        }
    }

    Ok(text)
}
