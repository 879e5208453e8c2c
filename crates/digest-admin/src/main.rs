use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use shared::{load_snapshot, Config, NewsletterRenderer, Store};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "digest-admin")]
#[command(about = "Manage newsletter subscribers and issue history")]
struct Args {
    /// Override the history database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add the built-in test subscribers
    Seed,
    /// Subscribe an email address
    Subscribe { email: String },
    /// Deactivate a subscriber
    Unsubscribe { email: String },
    /// List active subscribers
    Subscribers,
    /// Show the most recent issue and the items it carried
    LastIssue,
    /// Re-render a saved digest snapshot to HTML
    Render {
        /// Path to a digest snapshot (last_digest.json)
        snapshot: PathBuf,

        /// Output HTML file (defaults to the snapshot path with .html)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let db_override = args.db;
    let open_store = || -> Result<Store> {
        let config = Config::from_env()?;
        Store::open(&db_override.clone().unwrap_or(config.database_path))
    };

    match args.command {
        Command::Render { snapshot, out } => render(&snapshot, out)?,
        Command::Seed => {
            let store = open_store()?;
            for (email, added) in store.seed()? {
                if added {
                    println!("✓ Added {}", email);
                } else {
                    println!("  {} already subscribed", email);
                }
            }
        }
        Command::Subscribe { email } => match open_store()?.add_subscriber(&email)? {
            Some(subscriber) => println!("✓ Subscribed {} (id {})", subscriber.email, subscriber.id),
            None => println!("{} is already subscribed", email),
        },
        Command::Unsubscribe { email } => {
            if open_store()?.unsubscribe(&email)? {
                println!("✓ Unsubscribed {}", email);
            } else {
                anyhow::bail!("No subscriber with email {}", email);
            }
        }
        Command::Subscribers => {
            let subscribers = open_store()?.active_subscribers()?;
            println!("{} active subscribers", subscribers.len());
            for subscriber in subscribers {
                println!(
                    "  {}  (since {})",
                    subscriber.email,
                    subscriber.subscribed_at.format("%Y-%m-%d")
                );
            }
        }
        Command::LastIssue => {
            let store = open_store()?;
            match store.last_issue()? {
                Some(issue) => {
                    println!("Issue #{}: {}", issue.id, issue.subject);
                    println!("  Created: {}", issue.created_at.format("%Y-%m-%d %H:%M UTC"));
                    match (&issue.campaign_id, issue.sent_at) {
                        (Some(campaign), Some(sent)) => println!(
                            "  Sent:    {} (campaign {})",
                            sent.format("%Y-%m-%d %H:%M UTC"),
                            campaign
                        ),
                        _ => println!("  Sent:    not sent (dry run)"),
                    }
                    for item in store.issue_items(issue.id)? {
                        println!("  [{}] {}", item.category, item.title);
                        println!("      {}", item.url);
                    }
                }
                None => println!("No issues saved yet."),
            }
        }
    }

    Ok(())
}

fn render(snapshot: &Path, out: Option<PathBuf>) -> Result<()> {
    let data = load_snapshot(snapshot)?;

    let date = DateTime::parse_from_rfc3339(&data.created_at)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    let html = NewsletterRenderer::generate(&data.digest, &data.subject, date);
    let out = out.unwrap_or_else(|| snapshot.with_extension("html"));

    std::fs::write(&out, html)
        .with_context(|| format!("Failed to write rendered newsletter: {}", out.display()))?;

    println!("✓ Rendered \"{}\" to {}", data.subject, out.display());
    Ok(())
}
