//! The pipeline orchestrator: drives each lead through
//! scrape → screenshot → analyze → preview → email, persisting after every
//! step so a crash mid-pipeline leaves the lead resumable, and isolating
//! failures so one bad lead never aborts a batch.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::{PipelineConfig, SendingConfig};
use crate::database::{
    get_lead, insert_campaign, insert_lead, leads_with_drafted_emails, mark_lead_sent,
    recompute_campaign_totals, redraft_lead_email, set_lead_stage, update_lead_analysis,
    update_lead_email_draft, update_lead_preview, DbPool,
};
use crate::models::{BatchSummary, Lead, PreviewStatus, Result, SingleLeadOutcome, Stage};
use crate::services::{Collaborators, EmailDraft, SendStatus};

/// The one issue assigned to leads with no website at all. Kept literal:
/// downstream prompts and filters key off it.
pub const NO_WEBSITE_ISSUE: &str = "no website exists";

const NO_WEBSITE_SUMMARY: &str =
    "This business has no website at all — prime opportunity.";

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn default_campaign_name(niche: &str, location: &str) -> String {
    format!(
        "{} {} {}",
        title_case(niche),
        location,
        Utc::now().format("%b %Y")
    )
}

pub struct Pipeline {
    db_pool: DbPool,
    collaborators: Collaborators,
    pipeline_config: PipelineConfig,
    sending_config: SendingConfig,
}

impl Pipeline {
    pub fn new(
        db_pool: DbPool,
        collaborators: Collaborators,
        pipeline_config: PipelineConfig,
        sending_config: SendingConfig,
    ) -> Self {
        Self {
            db_pool,
            collaborators,
            pipeline_config,
            sending_config,
        }
    }

    /// Batch entry point: create a campaign, pull up to `limit` candidates
    /// from the lead source, persist each, then run the per-lead state
    /// machine sequentially. A failure in one lead is recorded in the
    /// summary and forces that lead to the error stage; the batch continues.
    pub async fn run_batch(
        &self,
        niche: &str,
        location: &str,
        limit: usize,
        campaign_name: Option<String>,
    ) -> Result<BatchSummary> {
        let name = campaign_name.unwrap_or_else(|| default_campaign_name(niche, location));
        let campaign_id = insert_campaign(&self.db_pool, &name, niche, location).await?;
        info!("Campaign {} created: {}", campaign_id, name);

        let businesses = self
            .collaborators
            .source
            .find(niche, location, limit)
            .await?;

        let mut summary = BatchSummary {
            campaign_id,
            scraped: businesses.len(),
            ..Default::default()
        };

        for record in &businesses {
            let lead_id = insert_lead(&self.db_pool, Some(campaign_id), record).await?;

            match self.advance(lead_id).await {
                Ok(lead) => {
                    if lead.site_score.is_some() {
                        summary.analyzed += 1;
                    }
                    if lead.preview_status == PreviewStatus::Ready {
                        summary.previews_generated += 1;
                    }
                    if lead.email_body.as_deref().is_some_and(|b| !b.is_empty()) {
                        summary.emails_drafted += 1;
                    }
                }
                Err(e) => {
                    let msg = format!("Lead {} ({}): {}", lead_id, record.business_name, e);
                    error!("Pipeline error: {}", msg);
                    summary.errors.push(msg);
                    set_lead_stage(&self.db_pool, lead_id, Stage::Error).await?;
                }
            }
        }

        recompute_campaign_totals(&self.db_pool, campaign_id).await?;
        info!(
            "Batch done: {} scraped, {} analyzed, {} previews, {} drafts, {} errors",
            summary.scraped,
            summary.analyzed,
            summary.previews_generated,
            summary.emails_drafted,
            summary.errors.len()
        );
        Ok(summary)
    }

    /// Retry/reprocess entry point: resume the state machine from whatever
    /// the lead's stored facts support. Idempotent: already-populated facts
    /// are reused, never recomputed.
    pub async fn process_single_lead(&self, lead_id: i64) -> SingleLeadOutcome {
        match get_lead(&self.db_pool, lead_id).await {
            Ok(None) => SingleLeadOutcome::NotFound { lead_id },
            Ok(Some(_)) => match self.advance(lead_id).await {
                Ok(lead) => SingleLeadOutcome::Ok {
                    lead_id,
                    stage: lead.stage,
                },
                Err(e) => SingleLeadOutcome::Error {
                    lead_id,
                    message: e.to_string(),
                },
            },
            Err(e) => SingleLeadOutcome::Error {
                lead_id,
                message: e.to_string(),
            },
        }
    }

    /// The per-lead state machine. Each step persists its facts before the
    /// next one runs; steps whose facts are already populated are skipped.
    async fn advance(&self, lead_id: i64) -> Result<Lead> {
        let mut lead = self.reload(lead_id).await?;

        // Outreach already underway: sent/responded/closed transitions are
        // driven manually or by inbound tracking, never by this machine.
        if lead.stage.is_manual() {
            debug!("Lead {} at {}, nothing to advance", lead_id, lead.stage);
            return Ok(lead);
        }

        if !lead.has_analysis() {
            match lead.website_url.clone() {
                Some(website) => {
                    let screenshot = self
                        .collaborators
                        .screenshotter
                        .capture(lead_id, &website)
                        .await;
                    let analysis = self
                        .collaborators
                        .scorer
                        .score(&lead, screenshot.as_deref())
                        .await?;
                    update_lead_analysis(
                        &self.db_pool,
                        lead_id,
                        analysis.score,
                        &analysis.issues,
                        &analysis.summary,
                        screenshot.as_deref(),
                    )
                    .await?;
                }
                None => {
                    // No website: maximal opportunity, flagged without
                    // spending an external call.
                    let issues = vec![NO_WEBSITE_ISSUE.to_string()];
                    update_lead_analysis(
                        &self.db_pool,
                        lead_id,
                        Some(0),
                        &issues,
                        NO_WEBSITE_SUMMARY,
                        None,
                    )
                    .await?;
                }
            }
            lead = self.reload(lead_id).await?;
        } else if matches!(lead.stage, Stage::Scraped | Stage::Error) {
            // Facts survived an earlier crash or errored run; realign the
            // stage before resuming.
            set_lead_stage(&self.db_pool, lead_id, Stage::Analyzed).await?;
            lead = self.reload(lead_id).await?;
        }

        // Qualification gate: a site at or above the threshold is good
        // enough that we spend no preview or email cost on it.
        if let Some(score) = lead.site_score {
            if score >= self.pipeline_config.min_score_threshold {
                debug!(
                    "Lead {} scored {} >= {}, stopping at analyzed",
                    lead_id, score, self.pipeline_config.min_score_threshold
                );
                return Ok(lead);
            }
        }

        if lead.preview_status != PreviewStatus::Ready {
            let result = self
                .collaborators
                .preview_builder
                .build(&lead, &lead.site_issues)
                .await;
            let stage = if result.status == PreviewStatus::Ready {
                Stage::PreviewReady
            } else {
                // Soft stop: the lead stays where it is and a later retry
                // can attempt the build again.
                lead.stage
            };
            update_lead_preview(
                &self.db_pool,
                lead_id,
                result.url.as_deref(),
                &result.prompt,
                result.status,
                stage,
            )
            .await?;
            lead = self.reload(lead_id).await?;

            if lead.preview_status != PreviewStatus::Ready {
                info!("Preview build failed for lead {}, soft stop at {}", lead_id, lead.stage);
                return Ok(lead);
            }
        }

        let needs_draft = lead.email_body.as_deref().map_or(true, |b| b.is_empty());
        if needs_draft {
            let draft = self
                .collaborators
                .drafter
                .draft(&lead, lead.preview_url.as_deref())
                .await?;
            update_lead_email_draft(&self.db_pool, lead_id, &draft.subject, &draft.body).await?;
            lead = self.reload(lead_id).await?;
        }

        Ok(lead)
    }

    /// Explicit re-draft: regenerates subject/body from the stored facts,
    /// even for a lead whose email already went out. This is the only
    /// sanctioned way to replace a sent email's draft.
    pub async fn redraft_email(&self, lead_id: i64) -> Result<Option<EmailDraft>> {
        let Some(lead) = get_lead(&self.db_pool, lead_id).await? else {
            return Ok(None);
        };
        let draft = self
            .collaborators
            .drafter
            .draft(&lead, lead.preview_url.as_deref())
            .await?;
        redraft_lead_email(&self.db_pool, lead_id, &draft.subject, &draft.body).await?;
        info!("Re-drafted email for lead {}", lead_id);
        Ok(Some(draft))
    }

    /// Send sweep: every lead sitting in draft with a non-empty body goes
    /// out through the email sender. A failed send is logged and the lead
    /// stays in draft for the next sweep; re-running only touches drafts.
    pub async fn sweep_and_send_drafted(&self) -> Result<usize> {
        let drafts = leads_with_drafted_emails(&self.db_pool).await?;
        if drafts.is_empty() {
            info!("No drafted emails to send");
            return Ok(0);
        }

        let mut sent = 0;
        for (i, lead) in drafts.iter().enumerate() {
            let Some(lead_id) = lead.id else { continue };
            let Some(to) = lead.email.as_deref() else {
                warn!("Lead {} has a drafted email but no address, skipping", lead_id);
                continue;
            };
            let subject = lead.email_subject.as_deref().unwrap_or_default();
            let body = lead.email_body.as_deref().unwrap_or_default();

            let outcome = self.collaborators.sender.send(to, subject, body, lead_id).await;
            match outcome.status {
                SendStatus::Sent => {
                    mark_lead_sent(&self.db_pool, lead_id, Utc::now()).await?;
                    sent += 1;
                    debug!(
                        "Sent email for lead {} (external id {:?})",
                        lead_id, outcome.external_id
                    );
                }
                SendStatus::Failed => {
                    warn!(
                        "Send failed for lead {}, leaving in draft: {:?}",
                        lead_id, outcome.error
                    );
                }
            }

            if i + 1 < drafts.len() {
                tokio::time::sleep(std::time::Duration::from_millis(
                    self.sending_config.delay_between_emails_ms,
                ))
                .await;
            }
        }

        info!("Sweep complete: {} of {} drafts sent", sent, drafts.len());
        Ok(sent)
    }

    async fn reload(&self, lead_id: i64) -> Result<Lead> {
        get_lead(&self.db_pool, lead_id)
            .await?
            .ok_or_else(|| format!("lead {} vanished mid-pipeline", lead_id).into())
    }
}
