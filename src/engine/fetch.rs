//! Page fetching with retry and backoff.

use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DocsiError, Result};

/// A fetched response, body fully read.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    /// `Content-Type` with parameters stripped, lowercased.
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// Whether the response can be fed to the HTML extractor.
    #[must_use]
    pub fn is_html_like(&self) -> bool {
        match self.content_type.as_deref() {
            // Servers that omit the header usually serve HTML.
            None => true,
            Some(ct) => {
                matches!(
                    ct,
                    "text/html" | "application/xhtml+xml" | "text/xml" | "application/xml"
                )
            }
        }
    }
}

/// Fetch a URL, retrying transient failures.
///
/// Up to `max_retries` attempts. HTTP 5xx and transport errors are
/// retried with exponential backoff (`2^attempt` seconds plus up to a
/// second of jitter before each retry); 4xx fails immediately and is
/// never retried. The per-request timeout comes from the client.
///
/// # Errors
///
/// `HttpClient` for 4xx, `Network` for everything else once retries
/// are exhausted.
pub async fn fetch_with_retry(client: &Client, url: &str, max_retries: u32) -> Result<FetchedPage> {
    let mut last_error = DocsiError::Network(format!("no attempts made for {url}"));

    for attempt in 0..max_retries {
        if attempt > 0 {
            let backoff = Duration::from_secs(1 << (attempt - 1));
            let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
            debug!(url, attempt, backoff = ?backoff, "backing off before retry");
            tokio::time::sleep(backoff + jitter).await;
        }

        match attempt_fetch(client, url).await {
            Ok(page) => return Ok(page),
            Err(e @ DocsiError::HttpClient { .. }) => {
                // Client errors are not transient.
                return Err(e);
            }
            Err(e) => {
                warn!(url, attempt, error = %e, "fetch attempt failed");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

async fn attempt_fetch(client: &Client, url: &str) -> Result<FetchedPage> {
    let response = client
        .get(url)
        .header(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .send()
        .await
        .map_err(|e| DocsiError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if status.is_client_error() {
        return Err(DocsiError::HttpClient {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(DocsiError::Network(format!("{url}: http {status}")));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(normalize_content_type);
    let final_url = response.url().to_string();
    let body = response
        .text()
        .await
        .map_err(|e| DocsiError::Network(format!("{url}: body read: {e}")))?;

    Ok(FetchedPage {
        url: final_url,
        status: status.as_u16(),
        content_type,
        body,
    })
}

/// Strip parameters and lowercase: `text/html; charset=utf-8` →
/// `text/html`.
fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_ascii_lowercase()
}
