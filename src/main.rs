use lead_pilot::config::{load_config, ApiKeys, Config};
use lead_pilot::database::create_db_pool;
use lead_pilot::models::{CliApp, Result};

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = match load_config("config.yml").await {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config.yml: {}. Using defaults.", e);
            Config::default()
        }
    };

    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("lead_pilot=info".parse().unwrap()),
        )
        .with_max_level(tracing::Level::INFO)
        .init();

    // Create output directory (screenshots land here)
    tokio::fs::create_dir_all(&config.output.directory).await?;

    // Initialize database
    info!("Initializing database...");
    let db_pool = create_db_pool("data/leadpilot.db").await?;

    // API keys decide mock vs real per collaborator
    let keys = ApiKeys::from_env();

    let app = CliApp::new(config, db_pool, keys).await?;

    // Graceful shutdown: let the current lead finish, then stop
    tokio::select! {
        result = app.run() => {
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
