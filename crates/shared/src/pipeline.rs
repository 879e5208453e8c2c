use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::assembler::{assemble, AssembledIssue};
use crate::categorizer::select_and_categorize;
use crate::error::PipelineError;
use crate::models::ContentItem;
use crate::summarizer::{enrich_items, ClaudeSummarizer, ENRICH_LIMIT};

/// Drop items a subscriber already received in an earlier issue
pub fn drop_already_sent(
    items: Vec<ContentItem>,
    sent_urls: &HashSet<String>,
) -> Vec<ContentItem> {
    let before = items.len();
    let fresh: Vec<ContentItem> = items
        .into_iter()
        .filter(|item| !sent_urls.contains(&item.url))
        .collect();

    if fresh.len() < before {
        info!(skipped = before - fresh.len(), "Skipping items sent in earlier issues");
    }
    fresh
}

/// Enrich, categorize and assemble one run's deduplicated items
pub async fn prepare_issue<R: Rng>(
    collected: Vec<ContentItem>,
    summarizer: Option<&ClaudeSummarizer>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<AssembledIssue, PipelineError> {
    if collected.is_empty() {
        warn!("No content collected, aborting");
        return Err(PipelineError::NoContent);
    }

    let enriched = enrich_items(collected, summarizer, ENRICH_LIMIT).await;
    let digest = select_and_categorize(enriched, now, rng);

    if !digest.has_content() {
        warn!("Every section is empty after categorization, aborting");
        return Err(PipelineError::NothingSelected);
    }

    let issue = assemble(digest, rng);
    info!(subject = %issue.subject, "Assembled issue");
    Ok(issue)
}
