use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::scorer::extract_json;
use super::{EmailDraft, EmailDrafter};
use crate::models::{Lead, Result};

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

const EMAIL_PROMPT: &str = r#"You are writing a cold outreach email in Dutch for a web design agency.

Target: {business_name}, a {business_type} in {city}
Their current website: {website_url}
Website score: {site_score}/100
Key issues: {issues}
Preview redesign URL: {preview_url}

Write a SHORT (max 150 words), personalized cold email in Dutch that:
1. Opens with something specific about THEIR business (not generic)
2. Mentions 1-2 specific issues with their current site (be tactful, not insulting)
3. Links to the preview redesign you already built for them
4. Ends with a soft CTA: "Wil je even kijken? Ik hoor graag wat je ervan vindt."
5. Feels human, not salesy. Like a helpful neighbor, not a pushy vendor.

Tone: Casual-professional Dutch. No "Geachte", use "Hoi {business_name}"
Subject line: Short, curiosity-driven, personalized

Return ONLY a JSON object (no markdown, no extra text):
{
    "subject": "...",
    "body": "..."
}"#;

#[derive(Debug, Deserialize)]
struct DraftPayload {
    subject: String,
    body: String,
}

// A lead can reach the drafting step with no analysis at all; missing facts
// become explicit placeholders rather than failing the stage.
fn fill_prompt(lead: &Lead, preview_url: Option<&str>) -> String {
    let issues = if lead.site_issues.is_empty() {
        "No analysis available".to_string()
    } else {
        lead.site_issues.join(", ")
    };
    let score = lead
        .site_score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    EMAIL_PROMPT
        .replace("{business_name}", &lead.business_name)
        .replace("{business_type}", &lead.business_type)
        .replace("{city}", &lead.city)
        .replace("{website_url}", lead.website_url.as_deref().unwrap_or("No website"))
        .replace("{site_score}", &score)
        .replace("{issues}", &issues)
        .replace("{preview_url}", preview_url.unwrap_or("Not yet generated"))
}

/// Personalized Dutch cold emails via the Anthropic Messages API.
pub struct ClaudeEmailDrafter {
    api_key: String,
    client: Client,
}

impl ClaudeEmailDrafter {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl EmailDrafter for ClaudeEmailDrafter {
    async fn draft(&self, lead: &Lead, preview_url: Option<&str>) -> Result<EmailDraft> {
        let prompt = fill_prompt(lead, preview_url);
        debug!("Drafting email for {}", lead.business_name);

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": ANTHROPIC_MODEL,
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Anthropic error {}: {}", status, body).into());
        }

        let data: serde_json::Value = response.json().await?;
        let text = data
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
            .ok_or("Anthropic response had no text content")?;

        let payload: DraftPayload = serde_json::from_str(extract_json(text))?;
        Ok(EmailDraft {
            subject: payload.subject,
            body: payload.body,
        })
    }
}

// (subject template, body template)
const MOCK_EMAILS: &[(&str, &str)] = &[
    (
        "Ik heb iets voor {name} gebouwd",
        "Hoi {name},\n\nIk kwam jullie website tegen en viel me op dat het design wat gedateerd oogt en de contactgegevens lastig te vinden zijn op mobiel.\n\nUit nieuwsgierigheid heb ik een modern alternatief in elkaar gezet — speciaal voor jullie:\n{preview}\n\nGeen verplichtingen, gewoon even kijken. Wil je even kijken? Ik hoor graag wat je ervan vindt.\n\nGroet,\nLeadPilot Team",
    ),
    (
        "Een nieuw jasje voor {name}?",
        "Hoi {name},\n\nToen ik jullie website bekeek viel me op dat deze niet optimaal werkt op telefoons en de laadtijd wat lang is.\n\nIk heb alvast een voorbeeld gemaakt van hoe het eruitzien kan:\n{preview}\n\nHet is vrijblijvend — ik ben benieuwd naar jullie reactie. Wil je even kijken? Ik hoor graag wat je ervan vindt.\n\nVriendelijke groet,\nLeadPilot Team",
    ),
    (
        "Jullie website kan zoveel meer doen",
        "Hoi {name},\n\nAls {type} in {city} doen jullie duidelijk goed werk — dat zie ik aan de reviews. Maar eerlijk gezegd doet jullie website dat niet helemaal recht.\n\nIk heb een gratis redesign-voorbeeld voor jullie gemaakt:\n{preview}\n\nWil je even kijken? Ik hoor graag wat je ervan vindt.\n\nGroeten,\nLeadPilot Team",
    ),
];

/// Development stand-in: Dutch templates with name/preview substitution.
pub struct MockEmailDrafter;

impl MockEmailDrafter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockEmailDrafter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailDrafter for MockEmailDrafter {
    async fn draft(&self, lead: &Lead, preview_url: Option<&str>) -> Result<EmailDraft> {
        let (subject, body) = MOCK_EMAILS[fastrand::usize(..MOCK_EMAILS.len())];
        let preview = preview_url.unwrap_or("https://preview.example.com");

        Ok(EmailDraft {
            subject: subject.replace("{name}", &lead.business_name),
            body: body
                .replace("{name}", &lead.business_name)
                .replace("{type}", &lead.business_type)
                .replace("{city}", &lead.city)
                .replace("{preview}", preview),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessRecord;

    fn lead() -> Lead {
        Lead::from_record(
            None,
            &BusinessRecord {
                business_name: "Tandarts Praktijk Jansen".to_string(),
                business_type: "dentist".to_string(),
                address: "".to_string(),
                city: "Utrecht".to_string(),
                phone: None,
                email: None,
                website_url: Some("http://tandartsjansen.nl".to_string()),
                maps_url: "".to_string(),
                rating: None,
                reviews_count: None,
            },
        )
    }

    #[tokio::test]
    async fn mock_drafter_substitutes_name_and_preview() {
        let drafter = MockEmailDrafter::new();
        let preview = "https://tandarts-jansen-abc123.jouwdomein.nl";
        let draft = drafter.draft(&lead(), Some(preview)).await.unwrap();
        assert!(!draft.subject.is_empty());
        assert!(draft.body.contains("Tandarts Praktijk Jansen"));
        assert!(draft.body.contains(preview));
    }

    #[test]
    fn prompt_degrades_to_placeholders_without_analysis() {
        let prompt = fill_prompt(&lead(), None);
        assert!(prompt.contains("No analysis available"));
        assert!(prompt.contains("N/A/100"));
        assert!(prompt.contains("Not yet generated"));
    }

    #[test]
    fn prompt_carries_score_and_issues_when_present() {
        let mut lead = lead();
        lead.site_score = Some(35);
        lead.site_issues = vec!["Cluttered navigation menu".to_string()];
        let prompt = fill_prompt(&lead, Some("https://p.jouwdomein.nl"));
        assert!(prompt.contains("35/100"));
        assert!(prompt.contains("Cluttered navigation menu"));
        assert!(prompt.contains("https://p.jouwdomein.nl"));
    }
}
