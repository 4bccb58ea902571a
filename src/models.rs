use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::Config, database::DbPool, pipeline::Pipeline};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Pipeline progress marker for a lead. String forms match the `stage`
/// column values in the leads table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scraped,
    Analyzed,
    PreviewReady,
    EmailDrafted,
    Sent,
    Responded,
    Closed,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Scraped => "scraped",
            Stage::Analyzed => "analyzed",
            Stage::PreviewReady => "preview_ready",
            Stage::EmailDrafted => "email_drafted",
            Stage::Sent => "sent",
            Stage::Responded => "responded",
            Stage::Closed => "closed",
            Stage::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Stage> {
        match s {
            "scraped" => Some(Stage::Scraped),
            "analyzed" => Some(Stage::Analyzed),
            "preview_ready" => Some(Stage::PreviewReady),
            "email_drafted" => Some(Stage::EmailDrafted),
            "sent" => Some(Stage::Sent),
            "responded" => Some(Stage::Responded),
            "closed" => Some(Stage::Closed),
            "error" => Some(Stage::Error),
            _ => None,
        }
    }

    /// Stages the orchestrator never advances into on its own.
    pub fn is_manual(&self) -> bool {
        matches!(self, Stage::Sent | Stage::Responded | Stage::Closed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    Pending,
    Ready,
    Failed,
}

impl PreviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewStatus::Pending => "pending",
            PreviewStatus::Ready => "ready",
            PreviewStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<PreviewStatus> {
        match s {
            "pending" => Some(PreviewStatus::Pending),
            "ready" => Some(PreviewStatus::Ready),
            "failed" => Some(PreviewStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Draft,
    Sent,
    Opened,
    Clicked,
    Replied,
    Bounced,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Draft => "draft",
            EmailStatus::Sent => "sent",
            EmailStatus::Opened => "opened",
            EmailStatus::Clicked => "clicked",
            EmailStatus::Replied => "replied",
            EmailStatus::Bounced => "bounced",
        }
    }

    pub fn from_str(s: &str) -> Option<EmailStatus> {
        match s {
            "draft" => Some(EmailStatus::Draft),
            "sent" => Some(EmailStatus::Sent),
            "opened" => Some(EmailStatus::Opened),
            "clicked" => Some(EmailStatus::Clicked),
            "replied" => Some(EmailStatus::Replied),
            "bounced" => Some(EmailStatus::Bounced),
            _ => None,
        }
    }

    /// Once an email left the building, the draft is locked. Only an
    /// explicit re-draft may replace subject/body after this.
    pub fn is_locked(&self) -> bool {
        !matches!(self, EmailStatus::Draft)
    }
}

/// What the lead source returns for one business listing. Source facts only,
/// immutable once the lead is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub business_name: String,
    pub business_type: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website_url: Option<String>,
    pub maps_url: String,
    pub rating: Option<f64>,
    pub reviews_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Option<i64>,
    pub campaign_id: Option<i64>,

    // Source facts
    pub business_name: String,
    pub business_type: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website_url: Option<String>,
    pub maps_url: String,
    pub rating: Option<f64>,
    pub reviews_count: Option<i64>,

    // Analysis facts
    pub screenshot_url: Option<String>,
    pub site_score: Option<i64>,
    pub site_issues: Vec<String>,
    pub analysis_summary: Option<String>,

    // Preview facts
    pub preview_url: Option<String>,
    pub preview_prompt: Option<String>,
    pub preview_status: PreviewStatus,

    // Outreach facts
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub email_status: Option<EmailStatus>,
    pub email_sent_at: Option<DateTime<Utc>>,

    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn from_record(campaign_id: Option<i64>, record: &BusinessRecord) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            campaign_id,
            business_name: record.business_name.clone(),
            business_type: record.business_type.clone(),
            address: record.address.clone(),
            city: record.city.clone(),
            phone: record.phone.clone(),
            email: record.email.clone(),
            website_url: record.website_url.clone(),
            maps_url: record.maps_url.clone(),
            rating: record.rating,
            reviews_count: record.reviews_count,
            screenshot_url: None,
            site_score: None,
            site_issues: Vec::new(),
            analysis_summary: None,
            preview_url: None,
            preview_prompt: None,
            preview_status: PreviewStatus::Pending,
            email_subject: None,
            email_body: None,
            email_status: None,
            email_sent_at: None,
            stage: Stage::Scraped,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_analysis(&self) -> bool {
        self.site_score.is_some() || !self.site_issues.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Option<i64>,
    pub name: String,
    pub niche: String,
    pub location: String,
    pub total_scraped: i64,
    pub total_qualified: i64,
    pub total_emailed: i64,
    pub total_replied: i64,
    pub total_closed: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// What a batch run hands back to the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub campaign_id: i64,
    pub scraped: usize,
    pub analyzed: usize,
    pub previews_generated: usize,
    pub emails_drafted: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub enum SingleLeadOutcome {
    Ok { lead_id: i64, stage: Stage },
    NotFound { lead_id: i64 },
    Error { lead_id: i64, message: String },
}

pub struct CliApp {
    pub config: Config,
    pub db_pool: DbPool,
    pub pipeline: Pipeline,
}
