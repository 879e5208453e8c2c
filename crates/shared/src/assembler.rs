use rand::Rng;

use crate::models::{ContentItem, Digest, DigestData, Entry, Section, Source};

pub const DEFAULT_BIG_STORY_TITLE: &str = "The Latest in AI";
pub const DEFAULT_PREVIEW_TEXT: &str = "The latest updates in the world of AI.";

/// A categorized digest with its subject line, ready to render
#[derive(Debug, Clone)]
pub struct AssembledIssue {
    pub subject: String,
    pub preview_text: String,
    pub digest: Digest,
}

impl AssembledIssue {
    pub fn snapshot(&self) -> DigestData {
        DigestData::new(
            self.subject.clone(),
            self.preview_text.clone(),
            self.digest.clone(),
        )
    }
}

impl Digest {
    /// The Big Story, or a placeholder record when the section is empty
    pub fn big_story(&self) -> Entry {
        self.entries(Section::BigStory)
            .first()
            .cloned()
            .unwrap_or_else(|| {
                Entry::Item(ContentItem::new(Source::Feed, DEFAULT_BIG_STORY_TITLE, ""))
            })
    }
}

pub fn subject_line<R: Rng>(big_story_title: &str, rng: &mut R) -> String {
    let variants = [
        format!("🤖 AI Weekly News: {}", big_story_title),
        format!("Your Weekly AI Briefing: {} & More", big_story_title),
        format!("This Week in AI: {}", big_story_title),
    ];
    let pick = rng.random_range(0..variants.len());
    variants[pick].clone()
}

pub fn assemble<R: Rng>(digest: Digest, rng: &mut R) -> AssembledIssue {
    let big_story = digest.big_story();
    let subject = subject_line(&big_story.title(), rng);

    let preview_text = match big_story.summary().trim() {
        "" => DEFAULT_PREVIEW_TEXT.to_string(),
        summary => summary.to_string(),
    };

    AssembledIssue {
        subject,
        preview_text,
        digest,
    }
}
