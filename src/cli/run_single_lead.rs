use dialoguer::{theme::ColorfulTheme, Input};

use crate::models::{CliApp, Result, SingleLeadOutcome};

impl CliApp {
    pub async fn run_single_lead(&self) -> Result<()> {
        println!("\n🔁 Re-process a single lead");

        let lead_id: i64 = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Lead id")
            .interact_text()?;

        match self.pipeline.process_single_lead(lead_id).await {
            SingleLeadOutcome::Ok { lead_id, stage } => {
                println!("✓ Lead {} is now at stage: {}", lead_id, stage);
            }
            SingleLeadOutcome::NotFound { lead_id } => {
                println!("❌ No lead with id {}", lead_id);
            }
            SingleLeadOutcome::Error { lead_id, message } => {
                println!("❌ Lead {} failed: {}", lead_id, message);
            }
        }

        Ok(())
    }
}
