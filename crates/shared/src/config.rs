use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const CONFIG_DIR_NAME: &str = "ai-weekly";

#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: Option<String>,
    pub github_token: Option<String>,
    pub x_bearer_token: Option<String>,
    pub database_path: PathBuf,
    pub admin_email: Option<String>,
}

/// Mailchimp settings, only needed when actually sending
#[derive(Debug, Clone)]
pub struct MailchimpConfig {
    pub api_key: String,
    pub server_prefix: String,
    pub list_id: String,
    pub from_name: String,
    pub reply_to: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let database_path = match optional_var("DATABASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };

        Ok(Self {
            anthropic_api_key: optional_var("ANTHROPIC_API_KEY"),
            github_token: optional_var("GITHUB_PAT"),
            x_bearer_token: optional_var("X_BEARER_TOKEN"),
            database_path,
            admin_email: optional_var("ADMIN_EMAIL"),
        })
    }

    pub fn mailchimp(&self) -> Result<MailchimpConfig> {
        Ok(MailchimpConfig {
            api_key: required_var("MAILCHIMP_API_KEY")?,
            server_prefix: required_var("MAILCHIMP_SERVER_PREFIX")?,
            list_id: required_var("MAILCHIMP_LIST_ID")?,
            from_name: optional_var("MAILCHIMP_FROM_NAME")
                .unwrap_or_else(|| "AI Weekly Newsletter".to_string()),
            reply_to: required_var("MAILCHIMP_REPLY_TO")?,
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/ai-weekly/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(CONFIG_DIR_NAME).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required_var(name: &str) -> Result<String> {
    optional_var(name).with_context(|| {
        format!(
            "{name} not found.\n\n\
            Sending requires the Mailchimp settings. Add them to ~/.config/{CONFIG_DIR_NAME}/.env:\n  \
            MAILCHIMP_API_KEY=your_key_here\n  \
            MAILCHIMP_SERVER_PREFIX=us21\n  \
            MAILCHIMP_LIST_ID=your_audience_id\n  \
            MAILCHIMP_REPLY_TO=you@example.com"
        )
    })
}

fn default_database_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join(CONFIG_DIR_NAME);

    std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("newsletter.db"))
}
