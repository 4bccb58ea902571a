use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::{PreviewBuilder, PreviewResult};
use crate::models::{Lead, PreviewStatus};

const LOVABLE_URL: &str = "https://api.lovable.dev/v1/projects";

/// URL-friendly slug from a business name, capped at 50 chars.
pub(crate) fn slugify(business_name: &str) -> String {
    let lowered = business_name.to_lowercase().replace(' ', "-");
    let re = Regex::new(r"[^a-z0-9-]").expect("static regex");
    let slug = re.replace_all(&lowered, "");
    slug.trim_matches('-').chars().take(50).collect()
}

/// The site brief sent to the preview vendor. Dutch, mobile-first, with the
/// phone number as the primary call to action when we have one.
pub(crate) fn build_prompt(lead: &Lead, issues: &[String]) -> String {
    let phone_cta = match &lead.phone {
        Some(phone) => format!("\"Bel ons: {}\"", phone),
        None => "\"Neem contact op\"".to_string(),
    };

    let issue_lines = if issues.is_empty() {
        String::new()
    } else {
        format!(
            "\nFix these problems from their current site:\n{}\n",
            issues
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    format!(
        r#"Create a modern, mobile-first website for {name}, a {biz_type} in {city}, Netherlands.
{issue_lines}
Requirements:
- Hero section with business name and a clear {phone_cta} call-to-action button
- Services section highlighting typical {biz_type} services
- About section with trust signals (years of experience, service area)
- Contact section with phone, address, and a simple contact form
- Footer with business hours and service area
- Color scheme: professional, clean (use blues/whites for trust)
- Language: Dutch
- Mobile-first responsive design
- Fast-loading, minimal JavaScript

Style: Modern, clean, professional. NOT generic template-looking.
"#,
        name = lead.business_name,
        biz_type = lead.business_type,
        city = lead.city,
        issue_lines = issue_lines,
        phone_cta = phone_cta,
    )
}

/// Redesign previews via the Lovable projects API. Any failure degrades to
/// `PreviewStatus::Failed` so the pipeline can soft-stop and retry later.
pub struct LovablePreviewBuilder {
    api_key: String,
    preview_domain: String,
    client: Client,
}

impl LovablePreviewBuilder {
    pub fn new(api_key: String, preview_domain: String) -> Self {
        Self {
            api_key,
            preview_domain,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl PreviewBuilder for LovablePreviewBuilder {
    async fn build(&self, lead: &Lead, issues: &[String]) -> PreviewResult {
        let prompt = build_prompt(lead, issues);
        debug!("Requesting preview build for lead {:?}", lead.id);

        let response = self
            .client
            .post(LOVABLE_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "prompt": prompt,
                "title": lead.business_name,
            }))
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("Preview build failed for lead {:?}: HTTP {}", lead.id, r.status());
                return PreviewResult {
                    url: None,
                    prompt,
                    status: PreviewStatus::Failed,
                };
            }
            Err(e) => {
                warn!("Preview build failed for lead {:?}: {}", lead.id, e);
                return PreviewResult {
                    url: None,
                    prompt,
                    status: PreviewStatus::Failed,
                };
            }
        };

        let data: serde_json::Value = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                warn!("Preview response parse failed for lead {:?}: {}", lead.id, e);
                return PreviewResult {
                    url: None,
                    prompt,
                    status: PreviewStatus::Failed,
                };
            }
        };

        let url = data
            .get("url")
            .and_then(|u| u.as_str())
            .map(|u| u.to_string())
            .unwrap_or_else(|| {
                format!("https://{}.{}", slugify(&lead.business_name), self.preview_domain)
            });

        PreviewResult {
            url: Some(url),
            prompt,
            status: PreviewStatus::Ready,
        }
    }
}

/// Development stand-in: slug-based URL under the preview domain, always
/// ready.
pub struct MockPreviewBuilder {
    preview_domain: String,
}

impl MockPreviewBuilder {
    pub fn new(preview_domain: String) -> Self {
        Self { preview_domain }
    }
}

#[async_trait]
impl PreviewBuilder for MockPreviewBuilder {
    async fn build(&self, lead: &Lead, issues: &[String]) -> PreviewResult {
        let prompt = build_prompt(lead, issues);
        let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(8)
            .collect::<String>()
            .to_lowercase();

        PreviewResult {
            url: Some(format!(
                "https://{}-{}.{}",
                slugify(&lead.business_name),
                suffix,
                self.preview_domain
            )),
            prompt,
            status: PreviewStatus::Ready,
        }
    }
}
