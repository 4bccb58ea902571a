use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{SiteAnalysis, SiteScorer};
use crate::models::{Lead, Result};

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

const ANALYSIS_PROMPT: &str = r#"You are a web design expert analyzing a small business website.
Look at this screenshot of {business_name} ({business_type} in {city}).

Score the website 1-100 on these criteria:
- Mobile readiness (does it look like it would work on mobile?)
- Visual design (modern vs outdated)
- Clear call-to-action (phone number, contact form visible?)
- Loading speed indicators (heavy images, cluttered layout?)
- Trust signals (reviews, certifications, about section?)
- SEO basics (clear headings, readable text?)

Return ONLY a JSON object (no markdown, no extra text):
{
    "score": 35,
    "issues": [
        "Issue 1",
        "Issue 2"
    ],
    "summary": "Brief summary of the website quality"
}"#;

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    score: Option<i64>,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    summary: String,
}

/// Strips markdown code fences the model sometimes wraps around its JSON.
pub(crate) fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
        return after.trim();
    }
    text.trim()
}

/// Website quality scoring via the Anthropic Messages API, with the
/// screenshot attached when one was captured.
pub struct ClaudeScorer {
    api_key: String,
    client: Client,
}

impl ClaudeScorer {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    fn build_prompt(lead: &Lead) -> String {
        ANALYSIS_PROMPT
            .replace("{business_name}", &lead.business_name)
            .replace("{business_type}", &lead.business_type)
            .replace("{city}", &lead.city)
    }
}

#[async_trait]
impl SiteScorer for ClaudeScorer {
    async fn score(&self, lead: &Lead, screenshot_ref: Option<&str>) -> Result<SiteAnalysis> {
        let prompt = Self::build_prompt(lead);
        let mut content = Vec::new();

        if let Some(path) = screenshot_ref {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                    content.push(json!({
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": "image/png",
                            "data": encoded,
                        },
                    }));
                }
                Err(e) => {
                    warn!("Could not read screenshot {}: {}", path, e);
                }
            }
        }
        content.push(json!({"type": "text", "text": prompt}));

        debug!("Scoring website for lead {:?}", lead.id);
        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": ANTHROPIC_MODEL,
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": content}],
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

        let payload: AnalysisPayload = serde_json::from_str(extract_json(text))?;
        Ok(SiteAnalysis {
            score: payload.score,
            issues: payload.issues,
            summary: payload.summary,
        })
    }
}

const MOCK_ISSUES: &[&str] = &[
    "Outdated design from early 2010s",
    "No visible phone number above the fold",
    "No mobile-responsive layout",
    "Missing call-to-action button",
    "No Google reviews or trust signals shown",
    "Slow-loading due to unoptimized images",
    "Missing SSL certificate (no HTTPS)",
    "No clear service descriptions",
    "Cluttered navigation menu",
    "Missing business hours",
    "No contact form visible",
    "Text too small to read on mobile",
];

/// Development stand-in: plausible low-to-middling scores and sampled issues.
pub struct MockScorer;

impl MockScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteScorer for MockScorer {
    async fn score(&self, lead: &Lead, _screenshot_ref: Option<&str>) -> Result<SiteAnalysis> {
        let score = fastrand::i64(15..=55);
        let num_issues = fastrand::usize(3..=6);

        let mut pool: Vec<&str> = MOCK_ISSUES.to_vec();
        fastrand::shuffle(&mut pool);
        let issues: Vec<String> = pool.iter().take(num_issues).map(|s| s.to_string()).collect();

        let summary = format!(
            "The {} website for {} in {} scores {}/100. Key issues include {} and {}.",
            lead.business_type,
            lead.business_name,
            lead.city,
            score,
            issues[0].to_lowercase(),
            issues[1].to_lowercase(),
        );

        Ok(SiteAnalysis {
            score: Some(score),
            issues,
            summary,
        })
    }
}
