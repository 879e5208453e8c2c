use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::feeds;
use crate::github;
use crate::models::{ContentItem, Source};
use crate::social::SocialClient;
use crate::transport::HttpClient;

pub const RESEARCH_FEED: &str = "http://export.arxiv.org/rss/cs.AI";

pub const BLOG_FEEDS: &[&str] = &[
    "https://blog.google/technology/ai/rss/",
    "https://openai.com/blog/rss.xml",
    "https://blogs.nvidia.com/ai-podcast/feed/",
    "https://www.deepmind.com/blog/rss.xml",
];

pub const REGIONAL_FEEDS: &[&str] = &[
    "https://analyticsindiamag.com/feed/",
    "https://yourstory.com/feed",
];

pub const JOB_FEED: &str = "https://weworkremotely.com/categories/remote-programming-jobs.rss";

pub const X_ACCOUNTS: &[&str] = &["karpathy", "ylecun", "AndrewYNg", "sama"];

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// RSS/Atom feed; items get the given source tag
    Feed(Source),
    RepositorySearch,
    SocialTimeline,
}

/// One external source: what to call and how many items to keep
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub name: String,
    pub kind: SourceKind,
    pub endpoint: String,
    pub limit: usize,
}

impl SourceDescriptor {
    pub fn feed(name: impl Into<String>, endpoint: impl Into<String>, limit: usize) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Feed(Source::Feed),
            endpoint: endpoint.into(),
            limit,
        }
    }
}

/// The sources of a weekly run, in fetch (and tie-break) order
pub fn default_sources(config: &Config, now: DateTime<Utc>) -> Vec<SourceDescriptor> {
    let mut sources = vec![SourceDescriptor::feed("arxiv", RESEARCH_FEED, 10)];

    for url in BLOG_FEEDS {
        sources.push(SourceDescriptor::feed("blog", *url, 5));
    }
    for url in REGIONAL_FEEDS {
        sources.push(SourceDescriptor::feed("regional", *url, 5));
    }

    sources.push(SourceDescriptor {
        name: "github".to_string(),
        kind: SourceKind::RepositorySearch,
        endpoint: github::trending_search_url(now),
        limit: 5,
    });

    sources.push(SourceDescriptor {
        name: "jobs".to_string(),
        kind: SourceKind::Feed(Source::JobBoard),
        endpoint: JOB_FEED.to_string(),
        limit: 5,
    });

    if config.x_bearer_token.is_some() {
        sources.push(SourceDescriptor {
            name: "x".to_string(),
            kind: SourceKind::SocialTimeline,
            endpoint: "https://api.x.com/2".to_string(),
            limit: 5,
        });
    } else {
        info!("X_BEARER_TOKEN not set, skipping X posts");
    }

    sources
}

pub struct Collector {
    http: HttpClient,
    github_token: Option<String>,
    x_bearer_token: Option<String>,
}

impl Collector {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            github_token: config.github_token.clone(),
            x_bearer_token: config.x_bearer_token.clone(),
        })
    }

    async fn fetch_source(
        &self,
        source: &SourceDescriptor,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>> {
        match &source.kind {
            SourceKind::Feed(tag) => {
                feeds::fetch_feed(&self.http, &source.endpoint, *tag, source.limit).await
            }
            SourceKind::RepositorySearch => {
                github::fetch_trending_repos(
                    &self.http,
                    &source.endpoint,
                    self.github_token.as_deref(),
                    source.limit,
                )
                .await
            }
            SourceKind::SocialTimeline => match self.x_bearer_token.as_deref() {
                Some(token) => {
                    let mut posts = SocialClient::new(&self.http, token)
                        .fetch_top_posts(X_ACCOUNTS, now)
                        .await?;
                    posts.truncate(source.limit);
                    Ok(posts)
                }
                None => Ok(Vec::new()),
            },
        }
    }

    /// Fetch every source concurrently, then merge in descriptor order
    pub async fn collect_all(
        &self,
        sources: &[SourceDescriptor],
        now: DateTime<Utc>,
    ) -> Vec<ContentItem> {
        info!(sources = sources.len(), "Starting content collection");

        let results = join_all(sources.iter().map(|s| self.fetch_source(s, now))).await;
        let outcomes = sources.iter().zip(results).collect::<Vec<_>>();

        let unique = merge_results(outcomes);
        info!(count = unique.len(), "Collected unique items from all sources");
        unique
    }
}

/// Drop failed sources (logged), concatenate the rest, dedupe
pub fn merge_results<'a, I>(outcomes: I) -> Vec<ContentItem>
where
    I: IntoIterator<Item = (&'a SourceDescriptor, Result<Vec<ContentItem>>)>,
{
    let mut all_items = Vec::new();

    for (source, outcome) in outcomes {
        match outcome {
            Ok(mut items) => {
                info!(source = %source.name, endpoint = %source.endpoint, count = items.len(), "fetched source");
                all_items.append(&mut items);
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(source = %source.name, endpoint = %source.endpoint, error = %reason, "source unavailable, continuing without it");
            }
        }
    }

    dedupe(all_items)
}

/// Keep the first item for each non-empty URL
pub fn dedupe(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen_urls: HashSet<String> = HashSet::new();

    items
        .into_iter()
        .filter(|item| !item.url.is_empty() && seen_urls.insert(item.url.clone()))
        .collect()
}
