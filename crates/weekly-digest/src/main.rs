use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgGroup, Parser};
use shared::collector::default_sources;
use shared::pipeline::{drop_already_sent, prepare_issue};
use shared::{
    output_dir, save_preview, save_snapshot, AssembledIssue, ClaudeSummarizer, Collector, Config,
    MailchimpMailer, NewsletterRenderer, Store,
};
use std::io::{self as stdio, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "weekly-digest")]
#[command(about = "Collect AI news, build the weekly newsletter, and preview or send it")]
#[command(group(ArgGroup::new("mode").required(true).args(["dry_run", "send"])))]
struct Args {
    /// Build the newsletter and write a local preview without sending.
    /// The issue is recorded, but its items stay eligible for the next send.
    #[arg(long)]
    dry_run: bool,

    /// Create a Mailchimp campaign and send it to the list
    #[arg(long)]
    send: bool,

    /// Address for a test send before the real one (defaults to ADMIN_EMAIL)
    #[arg(long, requires = "send")]
    test_email: Option<String>,

    /// Skip the confirmation prompt after the test email
    #[arg(short, long, requires = "send")]
    yes: bool,

    /// Override the history database path
    #[arg(long)]
    db: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(stdio::stderr))
        .init();
}

fn wait_for_confirmation(test_email: &str) -> Result<()> {
    println!("\n📬 Test email sent to {}", test_email);
    print!("Check it, then press Enter to send to the full list (Ctrl-C to abort): ");
    stdio::stdout().flush()?;

    let mut input = String::new();
    stdio::stdin().read_line(&mut input)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = Config::from_env()?;
    let db_path = args.db.clone().unwrap_or_else(|| config.database_path.clone());

    let now = Utc::now();

    println!("\n📡 Collecting content from all sources...");
    let collector = Collector::new(&config)?;
    let sources = default_sources(&config, now);
    let items = collector.collect_all(&sources, now).await;
    println!("✓ Collected {} unique items", items.len());

    let mut store = Store::open(&db_path)?;
    let items = drop_already_sent(items, &store.existing_urls()?);

    let summarizer = match config.anthropic_api_key.clone() {
        Some(key) => Some(ClaudeSummarizer::new(key)?),
        None => {
            println!("⚠ ANTHROPIC_API_KEY not set, using lead sentences as summaries");
            None
        }
    };

    println!("\n🤖 Summarizing and categorizing...");
    let issue = prepare_issue(items, summarizer.as_ref(), now, &mut rand::rng()).await?;
    println!("✓ Subject: {}", issue.subject);

    let html = NewsletterRenderer::generate(&issue.digest, &issue.subject, now);

    if args.dry_run {
        dry_run(&issue, &html, &mut store)
    } else {
        let test_email = args.test_email.or_else(|| config.admin_email.clone());
        send(&config, &issue, &html, test_email.as_deref(), args.yes, &mut store).await
    }
}

fn dry_run(issue: &AssembledIssue, html: &str, store: &mut Store) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    let dir = output_dir(&cwd)?;

    let preview_path = save_preview(&dir, html)?;
    let snapshot_path = save_snapshot(&dir, &issue.snapshot())?;

    let saved = store.save_issue(&issue.subject, html, &issue.digest.flatten(), None)?;

    println!("\n✅ Dry run complete (issue #{})", saved.id);
    println!("  Preview:  {}", preview_path.display());
    println!("  Snapshot: {}", snapshot_path.display());
    Ok(())
}

async fn send(
    config: &Config,
    issue: &AssembledIssue,
    html: &str,
    test_email: Option<&str>,
    skip_prompt: bool,
    store: &mut Store,
) -> Result<()> {
    let mailer = MailchimpMailer::new(config.mailchimp()?)?;

    println!("\n📨 Creating Mailchimp campaign...");
    let campaign_id = mailer
        .create_campaign(&issue.subject, &issue.preview_text)
        .await
        .context("Failed to create campaign")?;

    if !mailer.set_campaign_content(&campaign_id, html).await {
        anyhow::bail!("Failed to set content for campaign {}", campaign_id);
    }

    if let Some(email) = test_email {
        if !mailer.send_test_email(&campaign_id, email).await {
            anyhow::bail!("Failed to send test email to {}", email);
        }
        if !skip_prompt {
            wait_for_confirmation(email)?;
        }
    }

    if !mailer.send_campaign(&campaign_id).await {
        anyhow::bail!("Failed to send campaign {}", campaign_id);
    }

    let saved = store.save_issue(
        &issue.subject,
        html,
        &issue.digest.flatten(),
        Some(&campaign_id),
    )?;

    println!("\n✅ Newsletter sent (campaign {}, issue #{})", campaign_id, saved.id);
    Ok(())
}
