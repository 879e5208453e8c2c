// Public modules
pub mod assembler;
pub mod categorizer;
pub mod collector;
pub mod config;
pub mod error;
pub mod feeds;
pub mod github;
pub mod io;
pub mod mailer;
pub mod models;
pub mod newsletter;
pub mod pipeline;
pub mod social;
pub mod storage;
pub mod summarizer;
pub mod transport;

// Re-export commonly used types
pub use assembler::AssembledIssue;
pub use collector::{Collector, SourceDescriptor};
pub use config::{Config, MailchimpConfig};
pub use error::PipelineError;
pub use io::{load_snapshot, output_dir, save_preview, save_snapshot};
pub use mailer::MailchimpMailer;
pub use models::{ContentItem, Digest, DigestData, Entry, Section, Source};
pub use newsletter::NewsletterRenderer;
pub use storage::Store;
pub use summarizer::ClaudeSummarizer;
