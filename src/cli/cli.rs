use crate::config::{ApiKeys, Config};
use crate::database::DbPool;
use crate::models::{CliApp, Result};
use crate::pipeline::Pipeline;
use crate::services::Collaborators;

#[derive(Debug, Clone)]
pub enum MenuAction {
    RunCampaign,
    ProcessSingleLead,
    RedraftEmail,
    SendDraftedEmails,
    SeedMockLeads,
    ShowStats,
    Exit,
}

impl std::fmt::Display for MenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuAction::RunCampaign => {
                write!(f, "🚀 Run campaign: scrape → score → preview → draft")
            }
            MenuAction::ProcessSingleLead => {
                write!(f, "🔁 Re-process a single lead (retry from current stage)")
            }
            MenuAction::RedraftEmail => {
                write!(f, "✍️  Re-draft the email for a lead")
            }
            MenuAction::SendDraftedEmails => {
                write!(f, "📧 Send all drafted emails")
            }
            MenuAction::SeedMockLeads => {
                write!(f, "🌱 Seed mock leads (development)")
            }
            MenuAction::ShowStats => write!(f, "📊 Show database statistics"),
            MenuAction::Exit => write!(f, "🚪 Exit"),
        }
    }
}

impl CliApp {
    pub async fn new(config: Config, db_pool: DbPool, keys: ApiKeys) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config, &keys);
        let pipeline = Pipeline::new(
            db_pool.clone(),
            collaborators,
            config.pipeline.clone(),
            config.sending.clone(),
        );

        Ok(Self {
            config,
            db_pool,
            pipeline,
        })
    }
}
