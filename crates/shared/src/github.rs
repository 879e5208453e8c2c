use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::models::{ContentItem, Source};
use crate::transport::HttpClient;

const SEARCH_ENDPOINT: &str = "https://api.github.com/search/repositories";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: Option<String>,
    html_url: Option<String>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
}

/// Search URL for AI repositories created in the last 30 days, most starred first
pub fn trending_search_url(now: DateTime<Utc>) -> String {
    let since = (now - Duration::days(30)).format("%Y-%m-%d");
    let query = format!("topic:artificial-intelligence created:>{}", since);
    format!(
        "{}?q={}&sort=stars&order=desc",
        SEARCH_ENDPOINT,
        urlencoding::encode(&query)
    )
}

pub async fn fetch_trending_repos(
    http: &HttpClient,
    endpoint: &str,
    token: Option<&str>,
    limit: usize,
) -> Result<Vec<ContentItem>> {
    let body = http
        .send_with_retry(endpoint, || {
            let request = http
                .inner()
                .get(endpoint)
                .header("Accept", "application/vnd.github+json");
            match token {
                Some(token) => request.header("Authorization", format!("token {}", token)),
                None => request,
            }
        })
        .await?;

    parse_search_response(&body, limit)
}

pub fn parse_search_response(json: &str, limit: usize) -> Result<Vec<ContentItem>> {
    let response: SearchResponse =
        serde_json::from_str(json).context("Failed to parse GitHub search response")?;

    Ok(response
        .items
        .into_iter()
        .take(limit)
        .filter_map(|repo| {
            let url = repo.html_url?;
            let title = repo.full_name.unwrap_or_else(|| url.clone());
            let summary = repo
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "No description provided.".to_string());

            Some(
                ContentItem::new(Source::Repository, title, url)
                    .with_summary(summary)
                    .with_engagement(repo.stargazers_count),
            )
        })
        .collect())
}
