use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const MAX_ATTEMPTS: u32 = 3;

/// HTTP client shared by all fetchers
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET a URL and return the body, retrying transient failures a few times
    pub async fn get_text(&self, url: &str, bearer: Option<&str>) -> Result<String> {
        self.send_with_retry(url, || {
            let request = self.client.get(url);
            match bearer {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        })
        .await
    }

    pub async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = build().send().await;

            let retryable = match &outcome {
                Ok(response) => is_transient(response.status()),
                Err(e) => e.is_connect() || e.is_timeout(),
            };

            if retryable && attempt < MAX_ATTEMPTS {
                let backoff = Duration::from_millis(500 * 2_u64.pow(attempt - 1));
                debug!(url, attempt, ?backoff, "transient HTTP failure, retrying");
                tokio::time::sleep(backoff).await;
                continue;
            }

            let response = outcome.with_context(|| format!("Failed to send request to {url}"))?;
            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("unknown error"));
                anyhow::bail!("{} returned {} - {}", url, status, error_text);
            }

            return response
                .text()
                .await
                .with_context(|| format!("Failed to read response body from {url}"));
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient(StatusCode::NOT_FOUND));
        assert!(!is_transient(StatusCode::UNAUTHORIZED));
    }
}
