use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use super::{EmailSender, SendOutcome, SendStatus};

const INSTANTLY_BASE_URL: &str = "https://api.instantly.ai/api/v2";

/// Cold email dispatch via the Instantly.ai API.
pub struct InstantlySender {
    api_key: String,
    sending_email: String,
    client: Client,
}

impl InstantlySender {
    pub fn new(api_key: String, sending_email: String) -> Self {
        Self {
            api_key,
            sending_email,
            client: Client::new(),
        }
    }

    fn failed(error: String) -> SendOutcome {
        SendOutcome {
            status: SendStatus::Failed,
            external_id: None,
            error: Some(error),
        }
    }
}

#[async_trait]
impl EmailSender for InstantlySender {
    async fn send(&self, to: &str, subject: &str, body: &str, lead_id: i64) -> SendOutcome {
        let url = format!("{}/emails/send", INSTANTLY_BASE_URL);
        debug!("Sending email for lead {} to {}", lead_id, to);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.sending_email,
                "to": to,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                let status = r.status();
                let text = r.text().await.unwrap_or_default();
                error!("Email send failed for lead {}: {} {}", lead_id, status, text);
                return Self::failed(format!("Instantly error {}: {}", status, text));
            }
            Err(e) => {
                error!("Email send failed for lead {}: {}", lead_id, e);
                return Self::failed(e.to_string());
            }
        };

        let data: serde_json::Value = match response.json().await {
            Ok(d) => d,
            Err(e) => return Self::failed(format!("Instantly response parse error: {}", e)),
        };

        SendOutcome {
            status: SendStatus::Sent,
            external_id: data
                .get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            error: None,
        }
    }
}

/// Development stand-in: every send succeeds with a synthetic id.
pub struct MockEmailSender;

impl MockEmailSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, to: &str, _subject: &str, _body: &str, lead_id: i64) -> SendOutcome {
        debug!("Mock send for lead {} to {}", lead_id, to);
        SendOutcome {
            status: SendStatus::Sent,
            external_id: Some(format!("mock-{}-{}", lead_id, uuid::Uuid::new_v4())),
            error: None,
        }
    }
}
