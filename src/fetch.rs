use thiserror::Error;
use tracing::info;

/// Raw page markup plus the URL it came from. Consumed once by the reducer.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Error)]
#[error("failed to fetch {url}: {source}")]
pub struct FetchError {
    pub url: String,
    #[source]
    pub source: reqwest::Error,
}

/// Fetch a product page and return its raw HTML. Non-2xx statuses are fetch
/// failures; no retries here.
pub async fn fetch(url: &str) -> Result<RawDocument, FetchError> {
    info!("Fetching page: {}", url);
    let html = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| FetchError {
            url: url.to_string(),
            source,
        })?
        .text()
        .await
        .map_err(|source| FetchError {
            url: url.to_string(),
            source,
        })?;

    info!("Fetched {} bytes", html.len());
    Ok(RawDocument {
        url: url.to_string(),
        html,
    })
}
