//! End-to-end pipeline tests against a temp SQLite database with scripted
//! collaborators: the scorer returns a fixed score sequence and every
//! collaborator counts its invocations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use lead_pilot::config::Config;
use lead_pilot::database::{create_db_pool, get_campaign, get_lead, DbPool};
use lead_pilot::models::{
    BusinessRecord, EmailStatus, Lead, PreviewStatus, Result, SingleLeadOutcome, Stage,
};
use lead_pilot::pipeline::{Pipeline, NO_WEBSITE_ISSUE};
use lead_pilot::services::{
    Collaborators, EmailDraft, EmailDrafter, EmailSender, LeadSource, MockScreenshotter,
    PreviewBuilder, PreviewResult, SendOutcome, SendStatus, SiteAnalysis, SiteScorer,
};

fn record(name: &str, website: Option<&str>, email: Option<&str>) -> BusinessRecord {
    BusinessRecord {
        business_name: name.to_string(),
        business_type: "plumber".to_string(),
        address: "Voorbeeldstraat 1".to_string(),
        city: "Amsterdam".to_string(),
        phone: Some("+31 20 123 4567".to_string()),
        email: email.map(|s| s.to_string()),
        website_url: website.map(|s| s.to_string()),
        maps_url: "https://maps.google.com/?cid=1".to_string(),
        rating: Some(4.0),
        reviews_count: Some(10),
    }
}

struct ScriptedSource {
    records: Vec<BusinessRecord>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LeadSource for ScriptedSource {
    async fn find(
        &self,
        _niche: &str,
        _location: &str,
        limit: usize,
    ) -> Result<Vec<BusinessRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.iter().take(limit).cloned().collect())
    }
}

struct ScriptedScorer {
    // Ok(score) or Err(message), consumed one per call; defaults to Ok(30)
    // when the script runs dry.
    scores: Mutex<VecDeque<std::result::Result<i64, String>>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SiteScorer for ScriptedScorer {
    async fn score(&self, lead: &Lead, _screenshot_ref: Option<&str>) -> Result<SiteAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .scores
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(30));
        match next {
            Ok(score) => Ok(SiteAnalysis {
                score: Some(score),
                issues: vec!["Outdated design from early 2010s".to_string()],
                summary: format!("{} scores {}/100", lead.business_name, score),
            }),
            Err(message) => Err(message.into()),
        }
    }
}

struct ScriptedPreviewBuilder {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl PreviewBuilder for ScriptedPreviewBuilder {
    async fn build(&self, lead: &Lead, issues: &[String]) -> PreviewResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = format!("redesign for {} fixing {} issues", lead.business_name, issues.len());
        if self.fail {
            PreviewResult {
                url: None,
                prompt,
                status: PreviewStatus::Failed,
            }
        } else {
            PreviewResult {
                url: Some(format!("https://{}.preview.test", lead.id.unwrap_or_default())),
                prompt,
                status: PreviewStatus::Ready,
            }
        }
    }
}

struct ScriptedDrafter {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl EmailDrafter for ScriptedDrafter {
    async fn draft(&self, lead: &Lead, preview_url: Option<&str>) -> Result<EmailDraft> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmailDraft {
            subject: format!("Voor {}", lead.business_name),
            body: format!(
                "Hoi {}, kijk eens: {}",
                lead.business_name,
                preview_url.unwrap_or("(geen preview)")
            ),
        })
    }
}

struct ScriptedSender {
    calls: Arc<AtomicUsize>,
    fail_for_leads: Vec<i64>,
}

#[async_trait]
impl EmailSender for ScriptedSender {
    async fn send(&self, _to: &str, _subject: &str, _body: &str, lead_id: i64) -> SendOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for_leads.contains(&lead_id) {
            SendOutcome {
                status: SendStatus::Failed,
                external_id: None,
                error: Some("smtp unavailable".to_string()),
            }
        } else {
            SendOutcome {
                status: SendStatus::Sent,
                external_id: Some(format!("ext-{}", lead_id)),
                error: None,
            }
        }
    }
}

#[derive(Clone, Default)]
struct Counters {
    source: Arc<AtomicUsize>,
    scorer: Arc<AtomicUsize>,
    preview: Arc<AtomicUsize>,
    drafter: Arc<AtomicUsize>,
    sender: Arc<AtomicUsize>,
}

struct Script {
    records: Vec<BusinessRecord>,
    scores: Vec<std::result::Result<i64, String>>,
    preview_fails: bool,
    send_fails_for: Vec<i64>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            scores: Vec::new(),
            preview_fails: false,
            send_fails_for: Vec::new(),
        }
    }
}

fn scripted_collaborators(script: Script) -> (Collaborators, Counters) {
    let counters = Counters::default();
    let collaborators = Collaborators {
        source: Box::new(ScriptedSource {
            records: script.records,
            calls: counters.source.clone(),
        }),
        screenshotter: Box::new(MockScreenshotter::new()),
        scorer: Box::new(ScriptedScorer {
            scores: Mutex::new(script.scores.into_iter().collect()),
            calls: counters.scorer.clone(),
        }),
        preview_builder: Box::new(ScriptedPreviewBuilder {
            fail: script.preview_fails,
            calls: counters.preview.clone(),
        }),
        drafter: Box::new(ScriptedDrafter {
            calls: counters.drafter.clone(),
        }),
        sender: Box::new(ScriptedSender {
            calls: counters.sender.clone(),
            fail_for_leads: script.send_fails_for,
        }),
    };
    (collaborators, counters)
}

async fn test_pool() -> DbPool {
    let path = std::env::temp_dir().join(format!("lead-pilot-it-{}.db", uuid::Uuid::new_v4()));
    create_db_pool(path.to_str().unwrap()).await.unwrap()
}

async fn pipeline_with(script: Script, threshold: i64) -> (Pipeline, DbPool, Counters) {
    let pool = test_pool().await;
    let (collaborators, counters) = scripted_collaborators(script);
    let config = Config::default();
    let mut pipeline_config = config.pipeline.clone();
    pipeline_config.min_score_threshold = threshold;
    let mut sending_config = config.sending.clone();
    sending_config.delay_between_emails_ms = 0;
    let pipeline = Pipeline::new(pool.clone(), collaborators, pipeline_config, sending_config);
    (pipeline, pool, counters)
}

#[tokio::test]
async fn no_website_lead_is_flagged_without_spending_a_scorer_call() {
    let script = Script {
        records: vec![record("Kapper Studio Mooi", None, None)],
        ..Default::default()
    };
    let (pipeline, pool, counters) = pipeline_with(script, 50).await;

    let summary = pipeline
        .run_batch("hair_salon", "Rotterdam, Netherlands", 5, None)
        .await
        .unwrap();

    assert_eq!(summary.scraped, 1);
    assert_eq!(summary.analyzed, 1);
    assert!(summary.errors.is_empty());
    assert_eq!(counters.scorer.load(Ordering::SeqCst), 0);

    let lead = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(lead.site_score, Some(0));
    assert_eq!(lead.site_issues, vec![NO_WEBSITE_ISSUE.to_string()]);
    // Score 0 is far below any threshold, so the lead continues on to
    // preview and draft.
    assert_eq!(lead.stage, Stage::EmailDrafted);
}

#[tokio::test]
async fn good_site_short_circuits_at_analyzed() {
    let script = Script {
        records: vec![record("Bakkerij De Gouden Korst", Some("http://b.nl"), None)],
        scores: vec![Ok(80)],
        ..Default::default()
    };
    let (pipeline, pool, counters) = pipeline_with(script, 50).await;

    pipeline
        .run_batch("bakery", "Amsterdam, Netherlands", 5, None)
        .await
        .unwrap();

    let lead = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(lead.stage, Stage::Analyzed);
    assert_eq!(lead.site_score, Some(80));
    assert!(lead.preview_url.is_none());
    assert!(lead.email_subject.is_none());
    assert!(lead.email_body.is_none());
    assert_eq!(counters.preview.load(Ordering::SeqCst), 0);
    assert_eq!(counters.drafter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn low_score_reaches_email_drafted() {
    let script = Script {
        records: vec![record("Schoonmaakbedrijf Fris", Some("http://f.nl"), None)],
        scores: vec![Ok(20)],
        ..Default::default()
    };
    let (pipeline, pool, _) = pipeline_with(script, 50).await;

    let summary = pipeline
        .run_batch("cleaning", "Rotterdam, Netherlands", 5, None)
        .await
        .unwrap();

    assert_eq!(summary.previews_generated, 1);
    assert_eq!(summary.emails_drafted, 1);

    let lead = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(lead.stage, Stage::EmailDrafted);
    assert_eq!(lead.preview_status, PreviewStatus::Ready);
    assert_eq!(lead.email_status, Some(EmailStatus::Draft));
    assert!(lead.email_body.as_deref().unwrap().contains("preview.test"));
}

#[tokio::test]
async fn failed_preview_is_a_soft_stop_not_an_error() {
    let script = Script {
        records: vec![record("Garage Snelle Wielen", Some("http://g.nl"), None)],
        scores: vec![Ok(25)],
        preview_fails: true,
        ..Default::default()
    };
    let (pipeline, pool, counters) = pipeline_with(script, 50).await;

    let summary = pipeline
        .run_batch("auto_repair", "Rotterdam, Netherlands", 5, None)
        .await
        .unwrap();

    assert!(summary.errors.is_empty());
    assert_eq!(summary.previews_generated, 0);
    assert_eq!(summary.emails_drafted, 0);

    let lead = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(lead.stage, Stage::Analyzed);
    assert_eq!(lead.preview_status, PreviewStatus::Failed);
    assert!(lead.preview_url.is_none());
    assert_eq!(counters.drafter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn process_single_lead_is_idempotent_at_email_drafted() {
    let script = Script {
        records: vec![record("Elektricien Vonk", Some("http://v.nl"), None)],
        scores: vec![Ok(20)],
        ..Default::default()
    };
    let (pipeline, pool, counters) = pipeline_with(script, 50).await;

    pipeline
        .run_batch("electrician", "Amsterdam, Netherlands", 5, None)
        .await
        .unwrap();

    let before = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(before.stage, Stage::EmailDrafted);

    for _ in 0..2 {
        match pipeline.process_single_lead(1).await {
            SingleLeadOutcome::Ok { stage, .. } => assert_eq!(stage, Stage::EmailDrafted),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    let after = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(after.business_name, before.business_name);
    assert_eq!(after.website_url, before.website_url);
    assert_eq!(after.email_body, before.email_body);
    assert_eq!(after.site_score, before.site_score);

    // Source was hit once during the batch and never again; analysis facts
    // were reused, not recomputed.
    assert_eq!(counters.source.load(Ordering::SeqCst), 1);
    assert_eq!(counters.scorer.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn process_single_lead_reports_not_found() {
    let (pipeline, _pool, _) = pipeline_with(Script::default(), 50).await;
    match pipeline.process_single_lead(404).await {
        SingleLeadOutcome::NotFound { lead_id } => assert_eq!(lead_id, 404),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn one_failing_lead_never_aborts_the_batch() {
    let script = Script {
        records: vec![
            record("Eerste", Some("http://1.nl"), None),
            record("Tweede", Some("http://2.nl"), None),
            record("Derde", Some("http://3.nl"), None),
            record("Vierde", Some("http://4.nl"), None),
            record("Vijfde", Some("http://5.nl"), None),
        ],
        scores: vec![
            Ok(20),
            Ok(20),
            Err("scorer exploded".to_string()),
            Ok(20),
            Ok(20),
        ],
        ..Default::default()
    };
    let (pipeline, pool, _) = pipeline_with(script, 50).await;

    let summary = pipeline
        .run_batch("plumber", "Amsterdam, Netherlands", 5, None)
        .await
        .unwrap();

    assert_eq!(summary.scraped, 5);
    assert_eq!(summary.analyzed, 4);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("Lead 3"));
    assert!(summary.errors[0].contains("Derde"));
    assert!(summary.errors[0].contains("scorer exploded"));

    for (id, expected) in [
        (1, Stage::EmailDrafted),
        (2, Stage::EmailDrafted),
        (3, Stage::Error),
        (4, Stage::EmailDrafted),
        (5, Stage::EmailDrafted),
    ] {
        let lead = get_lead(&pool, id).await.unwrap().unwrap();
        assert_eq!(lead.stage, expected, "lead {}", id);
    }
}

#[tokio::test]
async fn sweep_with_zero_drafts_sends_nothing() {
    let (pipeline, _pool, counters) = pipeline_with(Script::default(), 50).await;
    let sent = pipeline.sweep_and_send_drafted().await.unwrap();
    assert_eq!(sent, 0);
    assert_eq!(counters.sender.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sweep_sends_drafts_once_and_leaves_failures_in_draft() {
    let script = Script {
        records: vec![
            record("Eerste", Some("http://1.nl"), Some("a@example.nl")),
            record("Tweede", Some("http://2.nl"), Some("b@example.nl")),
        ],
        scores: vec![Ok(20), Ok(20)],
        send_fails_for: vec![2],
        ..Default::default()
    };
    let (pipeline, pool, counters) = pipeline_with(script, 50).await;

    pipeline
        .run_batch("plumber", "Amsterdam, Netherlands", 5, None)
        .await
        .unwrap();

    let sent = pipeline.sweep_and_send_drafted().await.unwrap();
    assert_eq!(sent, 1);

    let first = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(first.stage, Stage::Sent);
    assert_eq!(first.email_status, Some(EmailStatus::Sent));
    assert!(first.email_sent_at.is_some());

    // The failed send is left in draft for a future sweep.
    let second = get_lead(&pool, 2).await.unwrap().unwrap();
    assert_eq!(second.stage, Stage::EmailDrafted);
    assert_eq!(second.email_status, Some(EmailStatus::Draft));

    // Re-running only touches what is still in draft.
    let script_calls_before = counters.sender.load(Ordering::SeqCst);
    let resent = pipeline.sweep_and_send_drafted().await.unwrap();
    assert_eq!(counters.sender.load(Ordering::SeqCst), script_calls_before + 1);
    assert!(resent <= 1);
}

#[tokio::test]
async fn redraft_replaces_a_sent_email_and_reopens_the_draft() {
    let script = Script {
        records: vec![record("Dakdekker Hoog", Some("http://d.nl"), Some("d@example.nl"))],
        scores: vec![Ok(20)],
        ..Default::default()
    };
    let (pipeline, pool, counters) = pipeline_with(script, 50).await;

    pipeline
        .run_batch("roofer", "Utrecht, Netherlands", 5, None)
        .await
        .unwrap();
    assert_eq!(pipeline.sweep_and_send_drafted().await.unwrap(), 1);

    let sent = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(sent.email_status, Some(EmailStatus::Sent));

    // The explicit re-draft path bypasses the sent-email lock.
    let draft = pipeline.redraft_email(1).await.unwrap().unwrap();
    assert_eq!(draft.subject, "Voor Dakdekker Hoog");
    assert_eq!(counters.drafter.load(Ordering::SeqCst), 2);

    let redrafted = get_lead(&pool, 1).await.unwrap().unwrap();
    assert_eq!(redrafted.email_status, Some(EmailStatus::Draft));
    assert_eq!(redrafted.email_subject.as_deref(), Some("Voor Dakdekker Hoog"));

    // An unknown lead is reported as absent, not as an error.
    assert!(pipeline.redraft_email(404).await.unwrap().is_none());
}

#[tokio::test]
async fn plumber_amsterdam_scenario_matches_expected_stages_and_counts() {
    let script = Script {
        records: vec![
            record("Van der Berg Loodgietersbedrijf", Some("http://1.nl"), None),
            record("Loodgieter De Kraan", Some("http://2.nl"), None),
            record("Sanitair Snel", Some("http://3.nl"), None),
        ],
        scores: vec![Ok(20), Ok(75), Ok(40)],
        ..Default::default()
    };
    let (pipeline, pool, _) = pipeline_with(script, 50).await;

    let summary = pipeline
        .run_batch("plumber", "Amsterdam, Netherlands", 3, None)
        .await
        .unwrap();

    assert_eq!(summary.scraped, 3);
    assert_eq!(summary.analyzed, 3);
    assert_eq!(summary.previews_generated, 2);
    assert_eq!(summary.emails_drafted, 2);
    assert!(summary.errors.is_empty());

    let mut stages = Vec::new();
    for id in [1, 2, 3] {
        stages.push(get_lead(&pool, id).await.unwrap().unwrap().stage);
    }
    assert_eq!(
        stages,
        vec![Stage::EmailDrafted, Stage::Analyzed, Stage::EmailDrafted]
    );

    // Campaign counters are recomputed from the final lead set.
    let campaign = get_campaign(&pool, summary.campaign_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(campaign.total_scraped, 3);
    assert_eq!(campaign.total_qualified, 3);
    assert_eq!(campaign.total_emailed, 0);
}
