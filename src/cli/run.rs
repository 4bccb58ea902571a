use dialoguer::{theme::ColorfulTheme, Select};
use tracing::error;

use crate::cli::cli::MenuAction;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run(&self) -> Result<()> {
        println!("\n🚀 Welcome to LeadPilot!");
        println!("═══════════════════════════════════════");

        // Show initial stats
        self.show_database_stats().await?;

        loop {
            let actions = vec![
                MenuAction::RunCampaign,
                MenuAction::ProcessSingleLead,
                MenuAction::RedraftEmail,
                MenuAction::SendDraftedEmails,
                MenuAction::SeedMockLeads,
                MenuAction::ShowStats,
                MenuAction::Exit,
            ];

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("\nSelect an action")
                .default(0)
                .items(&actions)
                .interact()?;

            match &actions[selection] {
                MenuAction::RunCampaign => {
                    if let Err(e) = self.run_campaign().await {
                        error!("Campaign failed: {}", e);
                    }
                }
                MenuAction::ProcessSingleLead => {
                    if let Err(e) = self.run_single_lead().await {
                        error!("Single lead processing failed: {}", e);
                    }
                }
                MenuAction::RedraftEmail => {
                    if let Err(e) = self.run_redraft_email().await {
                        error!("Re-draft failed: {}", e);
                    }
                }
                MenuAction::SendDraftedEmails => {
                    if let Err(e) = self.run_send_emails().await {
                        error!("Email sweep failed: {}", e);
                    }
                }
                MenuAction::SeedMockLeads => {
                    if let Err(e) = self.seed_mock_leads().await {
                        error!("Seeding failed: {}", e);
                    }
                }
                MenuAction::ShowStats => {
                    if let Err(e) = self.show_database_stats().await {
                        error!("Stats failed: {}", e);
                    }
                }
                MenuAction::Exit => {
                    println!("\n👋 Goodbye!");
                    break;
                }
            }
        }

        Ok(())
    }
}
