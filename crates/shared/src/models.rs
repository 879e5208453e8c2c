use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Feed,
    Repository,
    JobBoard,
    Social,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::Feed => "feed",
            Source::Repository => "repository",
            Source::JobBoard => "job-board",
            Source::Social => "social",
        }
    }
}

/// One piece of fetched content, normalized across sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub source: Source,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<Section>,
    /// Stars for repositories, likes + reposts for social posts
    #[serde(default)]
    pub engagement: Option<u64>,
}

impl ContentItem {
    pub fn new(source: Source, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source,
            title: title.into(),
            url: url.into(),
            summary: String::new(),
            published: None,
            category: None,
            engagement: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_engagement(mut self, engagement: u64) -> Self {
        self.engagement = Some(engagement);
        self
    }
}

/// Newsletter sections, declared in the order they appear in the email
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section {
    BigStory,
    RegionalNews,
    ResearchPaper,
    GithubRepo,
    XPost,
    JobSpotlight,
    QuoteOfTheWeek,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::BigStory,
        Section::RegionalNews,
        Section::ResearchPaper,
        Section::GithubRepo,
        Section::XPost,
        Section::JobSpotlight,
        Section::QuoteOfTheWeek,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::BigStory => "Big Story of the Week",
            Section::RegionalNews => "Regional AI News",
            Section::ResearchPaper => "Top Research Paper",
            Section::GithubRepo => "Top GitHub Repo",
            Section::XPost => "Top X Post",
            Section::JobSpotlight => "AI Job Spotlight",
            Section::QuoteOfTheWeek => "Quote of the Week",
        }
    }

    /// Ornamental sections carry static records and don't count as content
    pub fn is_ornamental(&self) -> bool {
        matches!(self, Section::QuoteOfTheWeek)
    }
}

/// A job item reshaped for the spotlight section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub employer: String,
    pub role: String,
    pub url: String,
    pub summary: String,
}

/// A curated quote; `key` is synthetic and never a real URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub quote: String,
    pub author: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Item(ContentItem),
    Job(JobPosting),
    Quote(Quote),
}

impl Entry {
    /// Identity key: the URL for real entries, a placeholder for static ones
    pub fn key(&self) -> &str {
        match self {
            Entry::Item(item) => &item.url,
            Entry::Job(job) => &job.url,
            Entry::Quote(quote) => &quote.key,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Entry::Item(item) => item.title.clone(),
            Entry::Job(job) => format!("{} at {}", job.role, job.employer),
            Entry::Quote(quote) => format!("Quote by {}", quote.author),
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            Entry::Item(item) => &item.summary,
            Entry::Job(job) => &job.summary,
            Entry::Quote(quote) => &quote.quote,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Entry::Quote(_))
    }
}

/// Section name -> entries, iterated in newsletter order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    sections: BTreeMap<Section, Vec<Entry>>,
}

impl Digest {
    pub fn new() -> Self {
        Self {
            sections: Section::ALL.iter().map(|s| (*s, Vec::new())).collect(),
        }
    }

    pub fn entries(&self, section: Section) -> &[Entry] {
        self.sections
            .get(&section)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty_section(&self, section: Section) -> bool {
        self.entries(section).is_empty()
    }

    pub fn push(&mut self, section: Section, entry: Entry) {
        self.sections.entry(section).or_default().push(entry);
    }

    pub fn sections(&self) -> impl Iterator<Item = (Section, &[Entry])> {
        self.sections.iter().map(|(s, e)| (*s, e.as_slice()))
    }

    /// True when at least one non-ornamental section has an entry
    pub fn has_content(&self) -> bool {
        self.sections()
            .any(|(section, entries)| !section.is_ornamental() && !entries.is_empty())
    }

    /// Every entry, in section order
    pub fn flatten(&self) -> Vec<(Section, &Entry)> {
        self.sections()
            .flat_map(|(section, entries)| entries.iter().map(move |e| (section, e)))
            .collect()
    }
}

/// Versioned snapshot of an assembled issue
#[derive(Debug, Serialize, Deserialize)]
pub struct DigestData {
    pub version: String,
    pub created_at: String,
    pub subject: String,
    pub preview_text: String,
    pub digest: Digest,
}

impl DigestData {
    pub fn new(subject: String, preview_text: String, digest: Digest) -> Self {
        Self {
            version: "1.0".to_string(),
            created_at: Utc::now().to_rfc3339(),
            subject,
            preview_text,
            digest,
        }
    }
}
