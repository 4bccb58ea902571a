use dialoguer::{theme::ColorfulTheme, Input};

use crate::database::insert_lead;
use crate::models::{CliApp, Result};
use crate::services::{LeadSource, MockLeadSource};

impl CliApp {
    /// Development helper: fill the database with mock leads without running
    /// any pipeline step on them.
    pub async fn seed_mock_leads(&self) -> Result<()> {
        println!("\n🌱 Seed mock leads");

        let count: usize = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("How many")
            .default(10)
            .interact_text()?;

        let source = MockLeadSource::new();
        let records = source
            .find(
                &self.config.pipeline.default_niche,
                &self.config.pipeline.default_location,
                count,
            )
            .await?;

        for record in &records {
            let id = insert_lead(&self.db_pool, None, record).await?;
            println!("   ✓ [{}] {}", id, record.business_name);
        }

        println!("✓ Seeded {} lead(s)", records.len());
        Ok(())
    }
}
