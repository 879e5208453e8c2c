use anyhow::{Context, Result};
use chrono::Utc;
use feed_rs::model::Link;
use feed_rs::parser;
use tracing::debug;

use crate::models::{ContentItem, Source};
use crate::transport::HttpClient;

/// Fetch an RSS/Atom feed and normalize up to `limit` entries
pub async fn fetch_feed(
    http: &HttpClient,
    url: &str,
    source: Source,
    limit: usize,
) -> Result<Vec<ContentItem>> {
    let body = http.get_text(url, None).await?;
    parse_feed(body.as_bytes(), source, limit).with_context(|| format!("Failed to parse feed {url}"))
}

pub fn parse_feed(content: &[u8], source: Source, limit: usize) -> Result<Vec<ContentItem>> {
    let feed = parser::parse(content).context("Invalid RSS/Atom document")?;

    let items: Vec<ContentItem> = feed
        .entries
        .into_iter()
        .take(limit)
        .filter_map(|entry| {
            // Entries without a link have no identity
            let url = entry_link(&entry.links)?.href.trim().to_string();
            if url.is_empty() {
                return None;
            }

            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|html| html_to_text(&html))
                .unwrap_or_default();

            let published = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc));

            Some(ContentItem {
                published,
                ..ContentItem::new(source, title, url).with_summary(summary)
            })
        })
        .collect();

    debug!(count = items.len(), source = source.label(), "parsed feed");
    Ok(items)
}

/// The entry's own page: `rel="alternate"`, else an untyped link, else the first one
fn entry_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.iter().find(|l| l.rel.is_none()))
        .or_else(|| links.first())
}

/// Feed summaries often carry markup; keep only the readable text
pub fn html_to_text(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), 10_000);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
