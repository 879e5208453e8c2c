use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::ContentItem;

/// Only the first items of a run get summarized, to bound API spend
pub const ENRICH_LIMIT: usize = 15;

const MAX_INPUT_CHARS: usize = 2000;

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    text: String,
}

pub struct ClaudeSummarizer {
    client: Client,
    api_key: String,
}

impl ClaudeSummarizer {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_key })
    }

    pub async fn summarize(&self, title: &str, text: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..3u32 {
            match self.try_summarize(title, text).await {
                Ok(summary) => return Ok(summary),
                Err(e) => {
                    let is_rate_limit = e.to_string().contains("rate_limit");
                    let backoff = if is_rate_limit {
                        std::time::Duration::from_secs(15 * (attempt as u64 + 1))
                    } else {
                        std::time::Duration::from_millis(1000 * 2_u64.pow(attempt))
                    };
                    last_error = Some(e);
                    if attempt < 2 {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries reached")))
    }

    async fn try_summarize(&self, title: &str, text: &str) -> Result<String> {
        let prompt = format!(
            r#"You are an expert AI content curator for a student newsletter.
Summarize the following article titled "{}" into 1-2 concise, engaging sentences (max 50 words).
Focus on the key takeaway or significance for a student learning about AI.
Avoid jargon where possible. Be direct and informative.

Article content:
---
{}
---
Summary:"#,
            title,
            truncate_chars(text, MAX_INPUT_CHARS)
        );

        let request = ClaudeRequest {
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 256,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Claude API")?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Claude API error: {}", error_text);
        }

        let claude_response = response
            .json::<ClaudeResponse>()
            .await
            .context("Failed to parse Claude API response")?;

        let summary = claude_response
            .content
            .first()
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default();

        if summary.is_empty() {
            anyhow::bail!("Claude returned an empty summary");
        }

        Ok(summary)
    }
}

/// Truncate to at most `max` chars without splitting a UTF-8 sequence
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// First two sentences of the text; used when no model is available
pub fn lead_summary(text: &str) -> String {
    let mut sentences = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(idx, c)) in chars.iter().enumerate() {
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.get(i + 1).map_or(true, |&(_, next)| next.is_whitespace());
        if at_boundary {
            let end = idx + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
            if sentences.len() == 2 {
                break;
            }
        }
    }

    if sentences.len() < 2 {
        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }
    }

    sentences.join(" ")
}

/// Replace summaries of the first `limit` items; failures keep the original text
pub async fn enrich_items(
    items: Vec<ContentItem>,
    summarizer: Option<&ClaudeSummarizer>,
    limit: usize,
) -> Vec<ContentItem> {
    info!(count = items.len().min(limit), "Summarizing items");

    stream::iter(items.into_iter().enumerate())
        .map(|(idx, item)| async move {
            if idx >= limit {
                return item;
            }
            enrich_item(item, summarizer).await
        })
        .buffered(2)
        .collect()
        .await
}

async fn enrich_item(mut item: ContentItem, summarizer: Option<&ClaudeSummarizer>) -> ContentItem {
    if let Some(summarizer) = summarizer {
        match summarizer.summarize(&item.title, &item.summary).await {
            Ok(summary) => {
                item.summary = summary;
                return item;
            }
            Err(e) => {
                warn!(title = %item.title, url = %item.url, error = %e, "summarization failed, using fallback");
            }
        }
    }

    let fallback = lead_summary(&item.summary);
    if !fallback.is_empty() {
        item.summary = fallback;
    }
    item
}
