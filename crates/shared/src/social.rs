use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::models::{ContentItem, Source};
use crate::transport::HttpClient;

const API_BASE: &str = "https://api.x.com/2";
const POSTS_PER_ACCOUNT: u32 = 5;
const TOP_POSTS: usize = 5;

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    data: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    text: String,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
}

/// Top recent posts from a fixed set of accounts
pub struct SocialClient<'a> {
    http: &'a HttpClient,
    bearer_token: &'a str,
}

impl<'a> SocialClient<'a> {
    pub fn new(http: &'a HttpClient, bearer_token: &'a str) -> Self {
        Self { http, bearer_token }
    }

    pub async fn fetch_top_posts(
        &self,
        accounts: &[&str],
        now: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>> {
        let start_time = now - Duration::days(7);
        let mut posts = Vec::new();

        // One failing account shouldn't cost the others
        for username in accounts {
            match self.fetch_account(username, start_time).await {
                Ok(mut items) => posts.append(&mut items),
                Err(e) => warn!(username, error = %e, "could not fetch posts"),
            }
        }

        Ok(rank_posts(posts, TOP_POSTS))
    }

    async fn fetch_account(
        &self,
        username: &str,
        start_time: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>> {
        let user_url = format!("{}/users/by/username/{}", API_BASE, username);
        let body = self.http.get_text(&user_url, Some(self.bearer_token)).await?;
        let user: UserResponse =
            serde_json::from_str(&body).context("Failed to parse X user response")?;

        let Some(user) = user.data else {
            return Ok(Vec::new());
        };

        let timeline_url = Url::parse_with_params(
            &format!("{}/users/{}/tweets", API_BASE, user.id),
            &[
                ("max_results", POSTS_PER_ACCOUNT.to_string()),
                (
                    "start_time",
                    start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                ("tweet.fields", "public_metrics,created_at".to_string()),
                ("exclude", "replies,retweets".to_string()),
            ],
        )
        .context("Failed to build X timeline URL")?;

        let body = self
            .http
            .get_text(timeline_url.as_str(), Some(self.bearer_token))
            .await?;

        parse_timeline(&body, username)
    }
}

fn parse_timeline(json: &str, username: &str) -> Result<Vec<ContentItem>> {
    let timeline: TimelineResponse =
        serde_json::from_str(json).context("Failed to parse X timeline response")?;

    Ok(timeline
        .data
        .into_iter()
        .map(|post| {
            let metrics = post.public_metrics.unwrap_or_default();
            ContentItem {
                published: post.created_at,
                ..ContentItem::new(
                    Source::Social,
                    format!("Post by @{}", username),
                    format!("https://x.com/{}/status/{}", username, post.id),
                )
                .with_summary(post.text)
                .with_engagement(metrics.like_count + metrics.retweet_count)
            }
        })
        .collect())
}

/// Most engaging first; ties keep fetch order
pub fn rank_posts(mut posts: Vec<ContentItem>, keep: usize) -> Vec<ContentItem> {
    posts.sort_by_key(|p| std::cmp::Reverse(p.engagement.unwrap_or(0)));
    posts.truncate(keep);
    posts
}
