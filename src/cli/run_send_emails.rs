use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::database::leads_with_drafted_emails;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run_send_emails(&self) -> Result<()> {
        println!("\n📧 Send drafted emails");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let drafts = leads_with_drafted_emails(&self.db_pool).await?;
        if drafts.is_empty() {
            println!("✓ Nothing to send — no leads in draft status.");
            return Ok(());
        }

        println!("Found {} drafted email(s):", drafts.len());
        for lead in drafts.iter().take(10) {
            println!(
                "   ✉️  [{}] {} — {}",
                lead.id.unwrap_or_default(),
                lead.business_name,
                lead.email_subject.as_deref().unwrap_or("(no subject)")
            );
        }
        if drafts.len() > 10 {
            println!("   … and {} more", drafts.len() - 10);
        }

        if drafts.len() > self.config.sending.require_confirmation_above {
            let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Really send {} emails?", drafts.len()))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("Aborted — nothing sent.");
                return Ok(());
            }
        }

        let sent = self.pipeline.sweep_and_send_drafted().await?;
        println!("\n✓ Sent {} of {} drafted email(s)", sent, drafts.len());
        if sent < drafts.len() {
            println!("   ⚠️  The rest stayed in draft and will be retried next sweep.");
        }

        Ok(())
    }
}
