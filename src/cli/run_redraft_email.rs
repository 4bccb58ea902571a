use dialoguer::{theme::ColorfulTheme, Confirm, Input};

use crate::database::get_lead;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run_redraft_email(&self) -> Result<()> {
        println!("\n✍️  Re-draft email");

        let lead_id: i64 = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Lead id")
            .interact_text()?;

        let Some(lead) = get_lead(&self.db_pool, lead_id).await? else {
            println!("❌ No lead with id {}", lead_id);
            return Ok(());
        };

        if lead.email_status.is_some_and(|s| s.is_locked()) {
            let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!(
                    "The email for {} was already sent. Replace the draft anyway?",
                    lead.business_name
                ))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("Aborted — draft untouched.");
                return Ok(());
            }
        }

        match self.pipeline.redraft_email(lead_id).await? {
            Some(draft) => {
                println!("✓ New draft for {}:", lead.business_name);
                println!("   Subject: {}", draft.subject);
                println!("   ─────────────────────────────");
                println!("{}", draft.body);
            }
            None => println!("❌ No lead with id {}", lead_id),
        }

        Ok(())
    }
}
