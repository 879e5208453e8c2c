use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::models::{Entry, Section};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS subscribers (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,
    subscribed_at TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS issues (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    subject      TEXT NOT NULL,
    content_html TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    sent_at      TEXT,
    campaign_id  TEXT
);

CREATE TABLE IF NOT EXISTS newsletter_items (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_id INTEGER NOT NULL REFERENCES issues(id),
    title    TEXT NOT NULL,
    url      TEXT NOT NULL UNIQUE,
    summary  TEXT NOT NULL,
    category TEXT NOT NULL
);
";

pub const SEED_SUBSCRIBERS: &[&str] = &[
    "test1@example.com",
    "student.ai@university.edu",
    "another-tester@domain.com",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: i64,
    pub subject: String,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub campaign_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub category: String,
}

/// Newsletter history: subscribers, issues and the items each issue carried
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create database schema")?;
        Ok(Self { conn })
    }

    // ==================== Subscribers ====================

    /// Returns None when the email is already subscribed
    pub fn add_subscriber(&self, email: &str) -> Result<Option<Subscriber>> {
        let now = Utc::now();
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO subscribers (email, subscribed_at, is_active) VALUES (?1, ?2, 1)",
                params![email, now.to_rfc3339()],
            )
            .context("Failed to insert subscriber")?;

        if inserted == 0 {
            return Ok(None);
        }
        self.get_subscriber(email)
    }

    pub fn get_subscriber(&self, email: &str) -> Result<Option<Subscriber>> {
        self.conn
            .query_row(
                "SELECT id, email, subscribed_at, is_active FROM subscribers WHERE email = ?1",
                params![email],
                row_to_subscriber,
            )
            .optional()
            .context("Failed to query subscriber")
    }

    pub fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, subscribed_at, is_active FROM subscribers WHERE is_active = 1 ORDER BY id",
        )?;
        let subscribers = stmt
            .query_map([], row_to_subscriber)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list subscribers")?;
        Ok(subscribers)
    }

    pub fn unsubscribe(&self, email: &str) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE subscribers SET is_active = 0 WHERE email = ?1",
                params![email],
            )
            .context("Failed to unsubscribe")?;
        Ok(updated > 0)
    }

    /// Add the test subscribers; returns (email, newly added) per address
    pub fn seed(&self) -> Result<Vec<(String, bool)>> {
        let mut results = Vec::with_capacity(SEED_SUBSCRIBERS.len());
        for email in SEED_SUBSCRIBERS {
            let added = self.add_subscriber(email)?.is_some();
            results.push((email.to_string(), added));
        }
        Ok(results)
    }

    // ==================== Issues ====================

    /// URLs carried by issues that were actually sent
    pub fn existing_urls(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM newsletter_items")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()
            .context("Failed to read stored item URLs")?;
        Ok(urls)
    }

    /// Record an issue. Item rows are written only for sent issues (with a
    /// campaign id); URLs already sent in an earlier issue are skipped.
    pub fn save_issue(
        &mut self,
        subject: &str,
        content_html: &str,
        entries: &[(Section, &Entry)],
        campaign_id: Option<&str>,
    ) -> Result<Issue> {
        let now = Utc::now();
        let sent_at = campaign_id.map(|_| now);

        let tx = self.conn.transaction().context("Failed to start transaction")?;

        tx.execute(
            "INSERT INTO issues (subject, content_html, created_at, sent_at, campaign_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                subject,
                content_html,
                now.to_rfc3339(),
                sent_at.map(|t| t.to_rfc3339()),
                campaign_id
            ],
        )
        .context("Failed to insert issue")?;
        let issue_id = tx.last_insert_rowid();

        let mut stored = 0;
        let sent_entries: &[(Section, &Entry)] = if campaign_id.is_some() {
            entries
        } else {
            &[]
        };
        for (section, entry) in sent_entries {
            let url = entry.key();
            if url.is_empty() {
                continue;
            }
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO newsletter_items (issue_id, title, url, summary, category) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![issue_id, entry.title(), url, entry.summary(), section.title()],
                )
                .context("Failed to insert newsletter item")?;
            if inserted == 0 {
                debug!(url, "item already sent in an earlier issue, skipping");
            }
            stored += inserted;
        }

        tx.commit().context("Failed to commit issue")?;
        info!(issue_id, stored, "Saved issue");

        Ok(Issue {
            id: issue_id,
            subject: subject.to_string(),
            content_html: content_html.to_string(),
            created_at: now,
            sent_at,
            campaign_id: campaign_id.map(String::from),
        })
    }

    pub fn last_issue(&self) -> Result<Option<Issue>> {
        self.conn
            .query_row(
                "SELECT id, subject, content_html, created_at, sent_at, campaign_id
                 FROM issues ORDER BY created_at DESC, id DESC LIMIT 1",
                [],
                |row| {
                    Ok(Issue {
                        id: row.get(0)?,
                        subject: row.get(1)?,
                        content_html: row.get(2)?,
                        created_at: parse_timestamp(3, row.get(3)?)?,
                        sent_at: row
                            .get::<_, Option<String>>(4)?
                            .map(|value| parse_timestamp(4, value))
                            .transpose()?,
                        campaign_id: row.get(5)?,
                    })
                },
            )
            .optional()
            .context("Failed to query last issue")
    }

    pub fn issue_items(&self, issue_id: i64) -> Result<Vec<StoredItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT title, url, summary, category FROM newsletter_items WHERE issue_id = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![issue_id], |row| {
                Ok(StoredItem {
                    title: row.get(0)?,
                    url: row.get(1)?,
                    summary: row.get(2)?,
                    category: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list issue items")?;
        Ok(items)
    }
}

fn row_to_subscriber(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subscriber> {
    Ok(Subscriber {
        id: row.get(0)?,
        email: row.get(1)?,
        subscribed_at: parse_timestamp(2, row.get(2)?)?,
        is_active: row.get(3)?,
    })
}

fn parse_timestamp(column: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, Quote, Source};

    fn item_entry(url: &str) -> Entry {
        Entry::Item(ContentItem::new(Source::Feed, format!("title {url}"), url).with_summary("s"))
    }

    // ==================== Subscriber Tests ====================

    #[test]
    fn test_add_subscriber_twice() {
        let store = Store::open_in_memory().unwrap();

        let first = store.add_subscriber("a@example.com").unwrap();
        assert!(first.is_some());
        assert!(first.unwrap().is_active);

        assert!(store.add_subscriber("a@example.com").unwrap().is_none());
    }

    #[test]
    fn test_unsubscribe() {
        let store = Store::open_in_memory().unwrap();
        store.add_subscriber("a@example.com").unwrap();
        store.add_subscriber("b@example.com").unwrap();

        assert!(store.unsubscribe("a@example.com").unwrap());
        assert!(!store.unsubscribe("missing@example.com").unwrap());

        let active: Vec<String> = store
            .active_subscribers()
            .unwrap()
            .into_iter()
            .map(|s| s.email)
            .collect();
        assert_eq!(active, vec!["b@example.com"]);
        assert!(!store.get_subscriber("a@example.com").unwrap().unwrap().is_active);
    }

    #[test]
    fn test_seed_is_repeatable() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.seed().unwrap().iter().all(|(_, added)| *added));
        assert!(store.seed().unwrap().iter().all(|(_, added)| !*added));
        assert_eq!(store.active_subscribers().unwrap().len(), SEED_SUBSCRIBERS.len());
    }

    // ==================== Issue Tests ====================

    #[test]
    fn test_save_issue_records_items() {
        let mut store = Store::open_in_memory().unwrap();
        let big = item_entry("https://openai.com/blog/x");
        let entries = vec![(Section::BigStory, &big)];

        let issue = store
            .save_issue("Subject", "<html>", &entries, Some("campaign-1"))
            .unwrap();

        assert_eq!(issue.subject, "Subject");
        assert!(issue.sent_at.is_some());
        let items = store.issue_items(issue.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, "Big Story of the Week");
        assert_eq!(items[0].title, "title https://openai.com/blog/x");
    }

    #[test]
    fn test_save_issue_skips_urls_from_earlier_issues() {
        let mut store = Store::open_in_memory().unwrap();
        let old = item_entry("https://openai.com/blog/old");
        let new = item_entry("https://openai.com/blog/new");

        store
            .save_issue("First", "<html>", &[(Section::BigStory, &old)], Some("campaign-0"))
            .unwrap();
        let second = store
            .save_issue(
                "Second",
                "<html>",
                &[(Section::BigStory, &new), (Section::ResearchPaper, &old)],
                Some("campaign-1"),
            )
            .unwrap();

        let items = store.issue_items(second.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://openai.com/blog/new");
        assert_eq!(store.existing_urls().unwrap().len(), 2);
        assert!(second.sent_at.is_some());
    }

    #[test]
    fn test_dry_run_issue_does_not_claim_urls() {
        let mut store = Store::open_in_memory().unwrap();
        let big = item_entry("https://openai.com/blog/x");
        let entries = vec![(Section::BigStory, &big)];

        let preview = store.save_issue("Subject", "<html>", &entries, None).unwrap();
        assert!(preview.sent_at.is_none());
        assert!(store.issue_items(preview.id).unwrap().is_empty());
        assert!(store.existing_urls().unwrap().is_empty());

        let sent = store
            .save_issue("Subject", "<html>", &entries, Some("campaign-1"))
            .unwrap();
        let items = store.issue_items(sent.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://openai.com/blog/x");
    }

    #[test]
    fn test_corrupt_timestamp_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO subscribers (email, subscribed_at, is_active) VALUES ('a@example.com', 'not a date', 1)",
                [],
            )
            .unwrap();

        assert!(store.get_subscriber("a@example.com").is_err());
        assert!(store.active_subscribers().is_err());
    }

    #[test]
    fn test_save_issue_stores_quote_key() {
        let mut store = Store::open_in_memory().unwrap();
        let quote = Entry::Quote(Quote {
            quote: "AI is the new electricity.".to_string(),
            author: "Andrew Ng".to_string(),
            key: "#/quote-1760000000".to_string(),
        });

        let issue = store
            .save_issue("s", "h", &[(Section::QuoteOfTheWeek, &quote)], Some("c-1"))
            .unwrap();

        let items = store.issue_items(issue.id).unwrap();
        assert_eq!(items[0].url, "#/quote-1760000000");
        assert_eq!(items[0].title, "Quote by Andrew Ng");
    }

    #[test]
    fn test_last_issue() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(store.last_issue().unwrap().is_none());

        store.save_issue("First", "a", &[], None).unwrap();
        store.save_issue("Second", "b", &[], Some("c-2")).unwrap();

        let last = store.last_issue().unwrap().unwrap();
        assert_eq!(last.subject, "Second");
        assert_eq!(last.campaign_id.as_deref(), Some("c-2"));
    }
}
