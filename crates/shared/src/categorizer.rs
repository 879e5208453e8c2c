//! Picks items for each newsletter section.
//!
//! Items are first split into provenance-exclusive pools by an ordered rule
//! table, then each section is filled from its pool: a priority pass first,
//! and a fallback pass only for sections the priority pass left empty.
//! Every real URL is claimed in an [`AssignedUrls`] accumulator so it can
//! land in at most one section.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::models::{ContentItem, Digest, Entry, JobPosting, Quote, Section, Source};

pub const RESEARCH_MARKER: &str = "arxiv.org";
pub const JOB_BOARD_MARKER: &str = "weworkremotely.com";

pub const REGIONAL_MARKERS: &[&str] = &[
    "analyticsindiamag.com",
    "indiaai.gov.in",
    "economictimes.indiatimes.com",
    "thehindu.com",
    "livemint.com",
    "yourstory.com",
];

pub const PRIORITY_KEYWORDS: &[&str] = &["openai", "google", "deepmind", "anthropic"];

pub const UNDISCLOSED_EMPLOYER: &str = "Undisclosed employer";
pub const GENERIC_ROLE: &str = "AI/ML Role";

pub const QUOTES: &[(&str, &str)] = &[
    (
        "The science of today is the technology of tomorrow.",
        "Edward Teller",
    ),
    ("The best way to predict the future is to invent it.", "Alan Kay"),
    ("AI is the new electricity.", "Andrew Ng"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PoolKind {
    ResearchPaper,
    Repository,
    Job,
    RegionalNews,
    GeneralBlog,
    Social,
}

pub struct PoolRule {
    pub kind: PoolKind,
    pub test: fn(&ContentItem) -> bool,
}

/// Evaluated top to bottom; the first matching rule owns the item
pub const POOL_RULES: &[PoolRule] = &[
    PoolRule {
        kind: PoolKind::ResearchPaper,
        test: |item| item.url.contains(RESEARCH_MARKER),
    },
    PoolRule {
        kind: PoolKind::Repository,
        test: |item| item.source == Source::Repository,
    },
    PoolRule {
        kind: PoolKind::Job,
        test: |item| item.url.contains(JOB_BOARD_MARKER),
    },
    PoolRule {
        kind: PoolKind::RegionalNews,
        test: |item| item.source == Source::Feed && is_regional(&item.url),
    },
    PoolRule {
        kind: PoolKind::GeneralBlog,
        test: |item| item.source == Source::Feed,
    },
    PoolRule {
        kind: PoolKind::Social,
        test: |item| item.source == Source::Social,
    },
];

pub fn is_regional(url: &str) -> bool {
    REGIONAL_MARKERS.iter().any(|marker| url.contains(marker))
}

pub fn has_priority_keyword(item: &ContentItem) -> bool {
    PRIORITY_KEYWORDS.iter().any(|key| item.url.contains(key))
}

pub fn classify(item: &ContentItem) -> Option<PoolKind> {
    POOL_RULES
        .iter()
        .find(|rule| (rule.test)(item))
        .map(|rule| rule.kind)
}

/// Items grouped by pool, each pool in input order
#[derive(Debug, Default)]
pub struct Pools {
    pools: BTreeMap<PoolKind, Vec<ContentItem>>,
}

impl Pools {
    pub fn get(&self, kind: PoolKind) -> &[ContentItem] {
        self.pools.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

pub fn partition(items: Vec<ContentItem>) -> Pools {
    let mut pools = Pools::default();
    for item in items {
        match classify(&item) {
            Some(kind) => pools.pools.entry(kind).or_default().push(item),
            None => debug!(url = %item.url, source = item.source.label(), "item matches no pool, dropping"),
        }
    }
    pools
}

/// URLs already placed in some section during one categorization pass
#[derive(Debug, Default)]
pub struct AssignedUrls {
    urls: HashSet<String>,
}

impl AssignedUrls {
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns false when the URL was already taken
    pub fn claim(&mut self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub(crate) fn len(&self) -> usize {
        self.urls.len()
    }
}

struct SectionPlan {
    section: Section,
    pool: PoolKind,
    cap: usize,
    preferred: Option<fn(&ContentItem) -> bool>,
}

const SECTION_PLANS: &[SectionPlan] = &[
    SectionPlan {
        section: Section::BigStory,
        pool: PoolKind::GeneralBlog,
        cap: 1,
        preferred: Some(has_priority_keyword),
    },
    SectionPlan {
        section: Section::RegionalNews,
        pool: PoolKind::RegionalNews,
        cap: 2,
        preferred: None,
    },
    SectionPlan {
        section: Section::ResearchPaper,
        pool: PoolKind::ResearchPaper,
        cap: 1,
        preferred: None,
    },
    SectionPlan {
        section: Section::GithubRepo,
        pool: PoolKind::Repository,
        cap: 1,
        preferred: None,
    },
    SectionPlan {
        section: Section::XPost,
        pool: PoolKind::Social,
        cap: 1,
        preferred: None,
    },
];

const JOB_CAP: usize = 2;

/// Take up to `cap` unassigned items passing `filter`, claiming their URLs
fn take_unassigned(
    pool: &[ContentItem],
    cap: usize,
    filter: impl Fn(&ContentItem) -> bool,
    assigned: &mut AssignedUrls,
) -> Vec<ContentItem> {
    let mut picked = Vec::new();
    for item in pool {
        if picked.len() == cap {
            break;
        }
        if filter(item) && !assigned.contains(&item.url) && assigned.claim(&item.url) {
            picked.push(item.clone());
        }
    }
    picked
}

/// Priority pass: only items matching `preferred` (or any item without one)
pub fn priority_fill(
    pool: &[ContentItem],
    cap: usize,
    preferred: Option<fn(&ContentItem) -> bool>,
    assigned: &mut AssignedUrls,
) -> Vec<ContentItem> {
    match preferred {
        Some(test) => take_unassigned(pool, cap, test, assigned),
        None => take_unassigned(pool, cap, |_| true, assigned),
    }
}

/// Fallback pass: any remaining unassigned item of the pool
pub fn fallback_fill(pool: &[ContentItem], cap: usize, assigned: &mut AssignedUrls) -> Vec<ContentItem> {
    take_unassigned(pool, cap, |_| true, assigned)
}

/// Split an `"Employer: Role"` job title on its first colon
pub fn job_posting(item: &ContentItem) -> JobPosting {
    let title = item.title.trim();

    let (employer, role) = match title.split_once(':') {
        Some((employer, role)) if !employer.trim().is_empty() && !role.trim().is_empty() => {
            (employer.trim().to_string(), role.trim().to_string())
        }
        _ => {
            let role = if title.is_empty() {
                GENERIC_ROLE.to_string()
            } else {
                title.to_string()
            };
            (UNDISCLOSED_EMPLOYER.to_string(), role)
        }
    };

    JobPosting {
        employer,
        role,
        url: item.url.clone(),
        summary: item.summary.clone(),
    }
}

pub fn quote_of_the_week<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Quote {
    let (quote, author) = QUOTES[rng.random_range(0..QUOTES.len())];
    Quote {
        quote: quote.to_string(),
        author: author.to_string(),
        key: format!("#/quote-{}", now.timestamp()),
    }
}

/// Assign deduplicated items to newsletter sections
pub fn select_and_categorize<R: Rng>(
    items: Vec<ContentItem>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Digest {
    info!(items = items.len(), "Categorizing and selecting top items");

    let pools = partition(items);
    let mut assigned = AssignedUrls::default();
    let mut digest = Digest::new();

    // Priority pass over every section before any fallback
    for plan in SECTION_PLANS {
        let picked = priority_fill(pools.get(plan.pool), plan.cap, plan.preferred, &mut assigned);
        if !picked.is_empty() {
            debug!(section = plan.section.title(), count = picked.len(), "filled by priority");
        }
        place(&mut digest, plan.section, picked);
    }

    for plan in SECTION_PLANS {
        if !digest.is_empty_section(plan.section) {
            continue;
        }
        let picked = fallback_fill(pools.get(plan.pool), plan.cap, &mut assigned);
        if picked.is_empty() {
            debug!(section = plan.section.title(), "no candidates, leaving empty");
        } else {
            debug!(section = plan.section.title(), count = picked.len(), "filled by fallback");
        }
        place(&mut digest, plan.section, picked);
    }

    for item in take_unassigned(pools.get(PoolKind::Job), JOB_CAP, |_| true, &mut assigned) {
        digest.push(Section::JobSpotlight, Entry::Job(job_posting(&item)));
    }

    digest.push(
        Section::QuoteOfTheWeek,
        Entry::Quote(quote_of_the_week(rng, now)),
    );

    info!(assigned = assigned.len(), "Finished categorizing content");
    digest
}

fn place(digest: &mut Digest, section: Section, items: Vec<ContentItem>) {
    for mut item in items {
        item.category = Some(section);
        digest.push(section, Entry::Item(item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn item(source: Source, url: &str, title: &str) -> ContentItem {
        ContentItem::new(source, title, url)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap()
    }

    fn categorize(items: Vec<ContentItem>) -> Digest {
        select_and_categorize(items, now(), &mut StdRng::seed_from_u64(7))
    }

    fn urls(digest: &Digest, section: Section) -> Vec<String> {
        digest
            .entries(section)
            .iter()
            .map(|e| e.key().to_string())
            .collect()
    }

    fn assert_exclusive(digest: &Digest) {
        let mut seen: HashMap<String, Section> = HashMap::new();
        for (section, entry) in digest.flatten() {
            if entry.is_synthetic() {
                continue;
            }
            if let Some(previous) = seen.insert(entry.key().to_string(), section) {
                panic!(
                    "{} appears in both {:?} and {:?}",
                    entry.key(),
                    previous,
                    section
                );
            }
        }
    }

    // ==================== Pool Rule Tests ====================

    #[test]
    fn test_rule_table_order() {
        let kinds: Vec<PoolKind> = POOL_RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PoolKind::ResearchPaper,
                PoolKind::Repository,
                PoolKind::Job,
                PoolKind::RegionalNews,
                PoolKind::GeneralBlog,
                PoolKind::Social,
            ]
        );
    }

    #[test]
    fn test_classify_paper_beats_repository_tag() {
        let paper = item(Source::Repository, "https://arxiv.org/abs/2410.1", "paper");
        assert_eq!(classify(&paper), Some(PoolKind::ResearchPaper));
    }

    #[test]
    fn test_classify_job_feed_on_job_board() {
        let job = item(Source::Feed, "https://weworkremotely.com/jobs/1", "Acme: Dev");
        assert_eq!(classify(&job), Some(PoolKind::Job));
    }

    #[test]
    fn test_classify_regional_and_general_blogs() {
        let regional = item(Source::Feed, "https://analyticsindiamag.com/ai-news/x", "r");
        let general = item(Source::Feed, "https://blogs.nvidia.com/blog/x", "g");
        assert_eq!(classify(&regional), Some(PoolKind::RegionalNews));
        assert_eq!(classify(&general), Some(PoolKind::GeneralBlog));
    }

    #[test]
    fn test_classify_unmatched_job_board_item() {
        // Tagged as a job-board item but not on the job board domain
        let stray = item(Source::JobBoard, "https://example.com/careers/1", "x");
        assert_eq!(classify(&stray), None);
    }

    // ==================== Fill Tests ====================

    #[test]
    fn test_priority_item_wins_over_earlier_blog() {
        let pool = vec![
            item(Source::Feed, "https://blogs.nvidia.com/blog/a", "nvidia"),
            item(Source::Feed, "https://openai.com/blog/b", "openai"),
        ];
        let mut assigned = AssignedUrls::default();

        let picked = priority_fill(&pool, 1, Some(has_priority_keyword), &mut assigned);

        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].url, "https://openai.com/blog/b");
        assert!(!assigned.contains("https://blogs.nvidia.com/blog/a"));
    }

    #[test]
    fn test_priority_fill_without_match_is_empty() {
        let pool = vec![item(Source::Feed, "https://blogs.nvidia.com/blog/a", "nvidia")];
        let mut assigned = AssignedUrls::default();

        let picked = priority_fill(&pool, 1, Some(has_priority_keyword), &mut assigned);
        assert!(picked.is_empty());
        assert_eq!(assigned.len(), 0);

        let picked = fallback_fill(&pool, 1, &mut assigned);
        assert_eq!(picked[0].url, "https://blogs.nvidia.com/blog/a");
        assert!(assigned.contains("https://blogs.nvidia.com/blog/a"));
    }

    #[test]
    fn test_fill_skips_assigned_urls() {
        let pool = vec![
            item(Source::Feed, "https://a.com", "a"),
            item(Source::Feed, "https://b.com", "b"),
        ];
        let mut assigned = AssignedUrls::default();
        assigned.claim("https://a.com");

        let picked = fallback_fill(&pool, 2, &mut assigned);

        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].url, "https://b.com");
    }

    #[test]
    fn test_empty_pool_leaves_section_empty() {
        let mut assigned = AssignedUrls::default();
        assert!(priority_fill(&[], 1, Some(has_priority_keyword), &mut assigned).is_empty());
        assert!(fallback_fill(&[], 1, &mut assigned).is_empty());
    }

    #[test]
    fn test_priority_pass_runs_before_any_fallback() {
        // The shared URL is the only blog, so Big Story needs its fallback;
        // the X post section claims it first during the priority pass.
        let digest = categorize(vec![
            item(Source::Feed, "https://blogs.nvidia.com/blog/shared", "blog copy"),
            item(Source::Social, "https://blogs.nvidia.com/blog/shared", "post copy"),
        ]);

        assert_eq!(
            urls(&digest, Section::XPost),
            vec!["https://blogs.nvidia.com/blog/shared"]
        );
        assert!(digest.is_empty_section(Section::BigStory));
    }

    // ==================== Job Tests ====================

    #[test]
    fn test_job_title_with_colon() {
        let job = job_posting(&item(
            Source::JobBoard,
            "https://weworkremotely.com/jobs/1",
            "Acme: Senior ML Engineer: Platform",
        ));
        assert_eq!(job.employer, "Acme");
        assert_eq!(job.role, "Senior ML Engineer: Platform");
    }

    #[test]
    fn test_job_title_without_colon() {
        let job = job_posting(&item(
            Source::JobBoard,
            "https://weworkremotely.com/jobs/2",
            "Machine Learning Engineer",
        ));
        assert_eq!(job.employer, UNDISCLOSED_EMPLOYER);
        assert_eq!(job.role, "Machine Learning Engineer");
    }

    #[test]
    fn test_job_title_empty_uses_generic_role() {
        let job = job_posting(&item(Source::JobBoard, "https://weworkremotely.com/jobs/3", "  "));
        assert_eq!(job.employer, UNDISCLOSED_EMPLOYER);
        assert_eq!(job.role, GENERIC_ROLE);
    }

    #[test]
    fn test_job_section_capped_at_two() {
        let digest = categorize(vec![
            item(Source::JobBoard, "https://weworkremotely.com/jobs/1", "A: one"),
            item(Source::JobBoard, "https://weworkremotely.com/jobs/2", "B: two"),
            item(Source::JobBoard, "https://weworkremotely.com/jobs/3", "C: three"),
        ]);
        assert_eq!(
            urls(&digest, Section::JobSpotlight),
            vec![
                "https://weworkremotely.com/jobs/1",
                "https://weworkremotely.com/jobs/2"
            ]
        );
    }

    // ==================== Quote Tests ====================

    #[test]
    fn test_quote_is_deterministic_for_a_seed() {
        let a = quote_of_the_week(&mut StdRng::seed_from_u64(42), now());
        let b = quote_of_the_week(&mut StdRng::seed_from_u64(42), now());
        assert_eq!(a, b);
        assert!(QUOTES.iter().any(|(q, who)| *q == a.quote && *who == a.author));
    }

    #[test]
    fn test_quote_key_is_synthetic() {
        let quote = quote_of_the_week(&mut StdRng::seed_from_u64(1), now());
        assert_eq!(quote.key, format!("#/quote-{}", now().timestamp()));
        assert!(!quote.key.starts_with("http"));
    }

    // ==================== Categorization Tests ====================

    #[test]
    fn test_concrete_scenario() {
        let input = crate::collector::dedupe(vec![
            item(Source::Feed, "https://openai.com/blog/x", "X"),
            item(Source::Feed, "https://openai.com/blog/x", "X"),
            item(Source::Repository, "https://github.com/a/b", "a/b"),
            item(Source::Feed, "https://arxiv.org/abs/1", "Paper"),
            item(Source::JobBoard, "https://weworkremotely.com/jobs/1", "Acme: Engineer"),
        ]);
        assert_eq!(input.len(), 4);

        let digest = categorize(input);

        assert_eq!(urls(&digest, Section::BigStory), vec!["https://openai.com/blog/x"]);
        assert_eq!(urls(&digest, Section::GithubRepo), vec!["https://github.com/a/b"]);
        assert_eq!(urls(&digest, Section::ResearchPaper), vec!["https://arxiv.org/abs/1"]);

        let jobs = digest.entries(Section::JobSpotlight);
        assert_eq!(jobs.len(), 1);
        match &jobs[0] {
            Entry::Job(job) => {
                assert_eq!(job.employer, "Acme");
                assert_eq!(job.role, "Engineer");
            }
            other => panic!("expected a job posting, got {:?}", other),
        }

        assert_eq!(digest.entries(Section::QuoteOfTheWeek).len(), 1);
        assert!(digest.is_empty_section(Section::RegionalNews));
        assert_exclusive(&digest);
    }

    #[test]
    fn test_paper_and_repository_never_swap_sections() {
        let digest = categorize(vec![
            item(Source::Repository, "https://arxiv.org/abs/99", "tagged repo, really a paper"),
            item(Source::Repository, "https://github.com/x/y", "repo"),
        ]);

        assert_eq!(urls(&digest, Section::ResearchPaper), vec!["https://arxiv.org/abs/99"]);
        assert_eq!(urls(&digest, Section::GithubRepo), vec!["https://github.com/x/y"]);
    }

    #[test]
    fn test_big_story_prefers_priority_organizations() {
        let digest = categorize(vec![
            item(Source::Feed, "https://blogs.nvidia.com/blog/first", "first"),
            item(Source::Feed, "https://deepmind.google/blog/second", "second"),
        ]);
        assert_eq!(
            urls(&digest, Section::BigStory),
            vec!["https://deepmind.google/blog/second"]
        );
    }

    #[test]
    fn test_big_story_falls_back_to_first_blog() {
        let digest = categorize(vec![
            item(Source::Feed, "https://blogs.nvidia.com/blog/first", "first"),
            item(Source::Feed, "https://blogs.nvidia.com/blog/second", "second"),
        ]);
        assert_eq!(
            urls(&digest, Section::BigStory),
            vec!["https://blogs.nvidia.com/blog/first"]
        );
    }

    #[test]
    fn test_regional_items_never_become_big_story() {
        let digest = categorize(vec![
            item(Source::Feed, "https://analyticsindiamag.com/openai-india", "regional openai"),
            item(Source::Feed, "https://yourstory.com/ai/a", "regional 2"),
            item(Source::Feed, "https://thehindu.com/sci-tech/b", "regional 3"),
        ]);

        assert!(digest.is_empty_section(Section::BigStory));
        assert_eq!(
            urls(&digest, Section::RegionalNews),
            vec![
                "https://analyticsindiamag.com/openai-india",
                "https://yourstory.com/ai/a"
            ]
        );
    }

    #[test]
    fn test_same_url_in_two_pools_is_placed_once() {
        // Not deduplicated: one URL reached both the blog and social pools
        let digest = categorize(vec![
            item(Source::Feed, "https://openai.com/index/x", "blog copy"),
            item(Source::Social, "https://openai.com/index/x", "social copy"),
        ]);

        assert_eq!(urls(&digest, Section::BigStory), vec!["https://openai.com/index/x"]);
        assert!(digest.is_empty_section(Section::XPost));
        assert_exclusive(&digest);
    }

    #[test]
    fn test_exclusivity_over_mixed_input() {
        let mut input = Vec::new();
        for i in 0..4 {
            input.push(item(Source::Feed, &format!("https://openai.com/blog/{i}"), "b"));
            input.push(item(Source::Feed, &format!("https://livemint.com/ai/{i}"), "r"));
            input.push(item(Source::Feed, &format!("https://arxiv.org/abs/{i}"), "p"));
            input.push(item(Source::Repository, &format!("https://github.com/o/{i}"), "g"));
            input.push(item(Source::Social, &format!("https://x.com/u/status/{i}"), "s"));
            input.push(item(Source::JobBoard, &format!("https://weworkremotely.com/jobs/{i}"), "J: r"));
            // Duplicates across source tags
            input.push(item(Source::Social, &format!("https://openai.com/blog/{i}"), "dup"));
            input.push(item(Source::Repository, &format!("https://arxiv.org/abs/{i}"), "dup"));
        }

        let digest = categorize(input);

        assert_exclusive(&digest);
        for section in Section::ALL {
            assert!(!digest.is_empty_section(section), "{:?} should be filled", section);
        }
        assert_eq!(digest.entries(Section::RegionalNews).len(), 2);
        assert_eq!(digest.entries(Section::JobSpotlight).len(), 2);
    }

    #[test]
    fn test_categorized_items_carry_their_section() {
        let digest = categorize(vec![item(Source::Feed, "https://openai.com/blog/x", "X")]);
        match &digest.entries(Section::BigStory)[0] {
            Entry::Item(item) => assert_eq!(item.category, Some(Section::BigStory)),
            other => panic!("expected an item, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_yields_only_the_quote() {
        let digest = categorize(Vec::new());
        assert!(!digest.has_content());
        assert_eq!(digest.entries(Section::QuoteOfTheWeek).len(), 1);
    }

    #[test]
    fn test_selection_is_deterministic_apart_from_quote() {
        let input = vec![
            item(Source::Feed, "https://blogs.nvidia.com/blog/a", "a"),
            item(Source::Feed, "https://openai.com/blog/b", "b"),
            item(Source::Repository, "https://github.com/a/b", "r"),
        ];
        let first = select_and_categorize(input.clone(), now(), &mut StdRng::seed_from_u64(1));
        let second = select_and_categorize(input, now(), &mut StdRng::seed_from_u64(2));

        for section in Section::ALL {
            if section.is_ornamental() {
                continue;
            }
            assert_eq!(first.entries(section), second.entries(section));
        }
    }
}
