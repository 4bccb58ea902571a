use dialoguer::{theme::ColorfulTheme, Input};

use crate::database::list_leads_for_campaign;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run_campaign(&self) -> Result<()> {
        println!("\n🚀 New outreach campaign");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let niche: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Niche")
            .default(self.config.pipeline.default_niche.clone())
            .interact_text()?;

        let location: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Location")
            .default(self.config.pipeline.default_location.clone())
            .interact_text()?;

        let limit: usize = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Max leads")
            .default(self.config.pipeline.batch_limit)
            .interact_text()?;

        println!(
            "\n🔍 Scraping up to {} {} businesses in {}...",
            limit, niche, location
        );

        let summary = self
            .pipeline
            .run_batch(&niche, &location, limit, None)
            .await?;

        println!("\n✓ Campaign complete:");
        println!("   📥 Scraped:          {}", summary.scraped);
        println!("   🔎 Analyzed:         {}", summary.analyzed);
        println!("   🎨 Previews ready:   {}", summary.previews_generated);
        println!("   ✉️  Emails drafted:   {}", summary.emails_drafted);

        let leads = list_leads_for_campaign(&self.db_pool, summary.campaign_id).await?;
        if !leads.is_empty() {
            println!("\n   Leads:");
            for lead in &leads {
                println!(
                    "   [{}] {:<35} score {:>3}  {}",
                    lead.id.unwrap_or_default(),
                    lead.business_name,
                    lead.site_score
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    lead.stage
                );
            }
        }

        if !summary.errors.is_empty() {
            println!("\n⚠️  {} lead(s) failed:", summary.errors.len());
            for error in &summary.errors {
                println!("   ❌ {}", error);
            }
        }

        Ok(())
    }
}
