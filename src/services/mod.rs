//! External collaborators behind narrow traits. Each has a real
//! implementation talking to a vendor API and a mock used in development;
//! which one runs is decided once at construction, never per call.

pub mod email_sender;
pub mod email_writer;
pub mod lead_source;
pub mod preview;
pub mod scorer;
pub mod screenshot;

use async_trait::async_trait;
use tracing::info;

use crate::config::{ApiKeys, Config};
use crate::models::{BusinessRecord, Lead, PreviewStatus, Result};

pub use email_sender::{InstantlySender, MockEmailSender};
pub use email_writer::{ClaudeEmailDrafter, MockEmailDrafter};
pub use lead_source::{MockLeadSource, OutscraperSource};
pub use preview::{LovablePreviewBuilder, MockPreviewBuilder};
pub use scorer::{ClaudeScorer, MockScorer};
pub use screenshot::{MockScreenshotter, ScreenshotOne};

#[derive(Debug, Clone)]
pub struct SiteAnalysis {
    pub score: Option<i64>,
    pub issues: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct PreviewResult {
    pub url: Option<String>,
    pub prompt: String,
    pub status: PreviewStatus,
}

#[derive(Debug, Clone)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub status: SendStatus,
    pub external_id: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn find(&self, niche: &str, location: &str, limit: usize)
        -> Result<Vec<BusinessRecord>>;
}

#[async_trait]
pub trait Screenshotter: Send + Sync {
    /// Returns a reference to the captured screenshot, or None when capture
    /// fails. Failure is soft: analysis proceeds without the image.
    async fn capture(&self, lead_id: i64, website_url: &str) -> Option<String>;
}

#[async_trait]
pub trait SiteScorer: Send + Sync {
    async fn score(&self, lead: &Lead, screenshot_ref: Option<&str>) -> Result<SiteAnalysis>;
}

#[async_trait]
pub trait PreviewBuilder: Send + Sync {
    /// Infallible by contract: a build failure comes back as
    /// `PreviewStatus::Failed`, which the orchestrator treats as a soft stop.
    async fn build(&self, lead: &Lead, issues: &[String]) -> PreviewResult;
}

#[async_trait]
pub trait EmailDrafter: Send + Sync {
    async fn draft(&self, lead: &Lead, preview_url: Option<&str>) -> Result<EmailDraft>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Delivery failures come back as a Failed outcome, not an error; the
    /// sweep leaves such leads in draft for a later run.
    async fn send(&self, to: &str, subject: &str, body: &str, lead_id: i64) -> SendOutcome;
}

/// The full collaborator set handed to the pipeline. Built once from config;
/// tests construct it directly with scripted implementations.
pub struct Collaborators {
    pub source: Box<dyn LeadSource>,
    pub screenshotter: Box<dyn Screenshotter>,
    pub scorer: Box<dyn SiteScorer>,
    pub preview_builder: Box<dyn PreviewBuilder>,
    pub drafter: Box<dyn EmailDrafter>,
    pub sender: Box<dyn EmailSender>,
}

impl Collaborators {
    pub fn from_config(config: &Config, keys: &ApiKeys) -> Self {
        let source: Box<dyn LeadSource> = if keys.use_mock(&keys.outscraper) {
            info!("Lead source: mock");
            Box::new(MockLeadSource::new())
        } else {
            info!("Lead source: Outscraper");
            Box::new(OutscraperSource::new(keys.outscraper.clone()))
        };

        let screenshotter: Box<dyn Screenshotter> = if keys.use_mock(&keys.screenshotone) {
            info!("Screenshotter: mock");
            Box::new(MockScreenshotter::new())
        } else {
            info!("Screenshotter: ScreenshotOne");
            Box::new(ScreenshotOne::new(
                keys.screenshotone.clone(),
                config.output.directory.clone(),
            ))
        };

        let scorer: Box<dyn SiteScorer> = if keys.use_mock(&keys.anthropic) {
            info!("Site scorer: mock");
            Box::new(MockScorer::new())
        } else {
            info!("Site scorer: Claude");
            Box::new(ClaudeScorer::new(keys.anthropic.clone()))
        };

        let preview_builder: Box<dyn PreviewBuilder> = if keys.use_mock(&keys.lovable) {
            info!("Preview builder: mock");
            Box::new(MockPreviewBuilder::new(config.pipeline.preview_domain.clone()))
        } else {
            info!("Preview builder: Lovable");
            Box::new(LovablePreviewBuilder::new(
                keys.lovable.clone(),
                config.pipeline.preview_domain.clone(),
            ))
        };

        let drafter: Box<dyn EmailDrafter> = if keys.use_mock(&keys.anthropic) {
            info!("Email drafter: mock");
            Box::new(MockEmailDrafter::new())
        } else {
            info!("Email drafter: Claude");
            Box::new(ClaudeEmailDrafter::new(keys.anthropic.clone()))
        };

        let sender: Box<dyn EmailSender> = if keys.use_mock(&keys.instantly) {
            info!("Email sender: mock");
            Box::new(MockEmailSender::new())
        } else {
            info!("Email sender: Instantly");
            Box::new(InstantlySender::new(
                keys.instantly.clone(),
                keys.instantly_sending_email.clone(),
            ))
        };

        Self {
            source,
            screenshotter,
            scorer,
            preview_builder,
            drafter,
            sender,
        }
    }
}
