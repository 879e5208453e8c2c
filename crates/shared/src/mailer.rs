use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::MailchimpConfig;

/// Mailchimp Marketing API client for one audience list
pub struct MailchimpMailer {
    client: Client,
    config: MailchimpConfig,
    api_url: String,
}

impl MailchimpMailer {
    pub fn new(config: MailchimpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let api_url = api_base_url(&config.server_prefix);
        Ok(Self {
            client,
            config,
            api_url,
        })
    }

    async fn request(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/{}", self.api_url, endpoint);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", format!("apikey {}", self.config.api_key));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send Mailchimp request {} {}", method, endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            error!(%method, endpoint, %status, body = %error_text, "Mailchimp API error");
            anyhow::bail!("Mailchimp API error for {} {}: {}", method, endpoint, status);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Object(Default::default()));
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse Mailchimp response")
    }

    /// Create a regular campaign for the list and return its id
    pub async fn create_campaign(&self, subject: &str, preview_text: &str) -> Result<String> {
        info!("Creating Mailchimp campaign");
        let body = campaign_body(&self.config, subject, preview_text);
        let response = self.request(Method::POST, "campaigns", Some(body)).await?;

        let campaign_id = response
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .context("Mailchimp response did not include a campaign id")?;

        info!(campaign_id = %campaign_id, "Campaign created");
        Ok(campaign_id)
    }

    pub async fn set_campaign_content(&self, campaign_id: &str, html: &str) -> bool {
        info!(campaign_id, "Setting campaign content");
        let endpoint = format!("campaigns/{}/content", campaign_id);
        self.request(Method::PUT, &endpoint, Some(json!({ "html": html })))
            .await
            .is_ok()
    }

    pub async fn send_test_email(&self, campaign_id: &str, test_email: &str) -> bool {
        info!(campaign_id, test_email, "Sending test email");
        let endpoint = format!("campaigns/{}/actions/test", campaign_id);
        let body = json!({ "test_emails": [test_email], "send_type": "html" });
        self.request(Method::POST, &endpoint, Some(body)).await.is_ok()
    }

    pub async fn send_campaign(&self, campaign_id: &str) -> bool {
        info!(campaign_id, list_id = %self.config.list_id, "Sending campaign to list");
        let endpoint = format!("campaigns/{}/actions/send", campaign_id);
        self.request(Method::POST, &endpoint, None).await.is_ok()
    }
}

fn api_base_url(server_prefix: &str) -> String {
    format!("https://{}.api.mailchimp.com/3.0", server_prefix)
}

fn campaign_body(config: &MailchimpConfig, subject: &str, preview_text: &str) -> Value {
    json!({
        "type": "regular",
        "recipients": { "list_id": config.list_id },
        "settings": {
            "subject_line": subject,
            "preview_text": preview_text,
            "from_name": config.from_name,
            "reply_to": config.reply_to,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailchimpConfig {
        MailchimpConfig {
            api_key: "key-us21".to_string(),
            server_prefix: "us21".to_string(),
            list_id: "list123".to_string(),
            from_name: "AI Weekly Newsletter".to_string(),
            reply_to: "editor@example.com".to_string(),
        }
    }

    #[test]
    fn test_api_base_url() {
        assert_eq!(api_base_url("us21"), "https://us21.api.mailchimp.com/3.0");
    }

    #[test]
    fn test_campaign_body() {
        let body = campaign_body(&config(), "This Week in AI: X", "Preview");

        assert_eq!(body["type"], "regular");
        assert_eq!(body["recipients"]["list_id"], "list123");
        assert_eq!(body["settings"]["subject_line"], "This Week in AI: X");
        assert_eq!(body["settings"]["preview_text"], "Preview");
        assert_eq!(body["settings"]["from_name"], "AI Weekly Newsletter");
        assert_eq!(body["settings"]["reply_to"], "editor@example.com");
    }
}
