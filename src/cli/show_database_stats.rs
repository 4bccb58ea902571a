use crate::database::{count_campaigns, count_leads, lead_counts_by_stage};
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn show_database_stats(&self) -> Result<()> {
        let leads = count_leads(&self.db_pool).await?;
        let campaigns = count_campaigns(&self.db_pool).await?;

        println!("\n📊 Database statistics");
        println!("   📇 Leads:     {}", leads);
        println!("   📣 Campaigns: {}", campaigns);

        let by_stage = lead_counts_by_stage(&self.db_pool).await?;
        if !by_stage.is_empty() {
            println!("   By stage:");
            for (stage, count) in by_stage {
                println!("      {:<15} {}", stage, count);
            }
        }

        Ok(())
    }
}
