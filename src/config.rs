use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub sending: SendingConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Leads scoring at or above this are left alone; their site is good
    /// enough that a redesign pitch would fall flat.
    pub min_score_threshold: i64,
    pub default_niche: String,
    pub default_location: String,
    pub batch_limit: usize,
    /// Domain under which generated preview sites are hosted.
    pub preview_domain: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendingConfig {
    pub from_email: String,
    pub from_name: String,
    pub delay_between_emails_ms: u64,
    /// Ask for confirmation before sweeping more drafts than this.
    pub require_confirmation_above: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub progress_interval: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub directory: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig {
                min_score_threshold: 50,
                default_niche: "plumber".to_string(),
                default_location: "Amsterdam, Netherlands".to_string(),
                batch_limit: 20,
                preview_domain: "jouwdomein.nl".to_string(),
            },
            sending: SendingConfig {
                from_email: "hallo@leadpilot.nl".to_string(),
                from_name: "LeadPilot".to_string(),
                delay_between_emails_ms: 3000,
                require_confirmation_above: 25,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                progress_interval: 10,
            },
            output: OutputConfig {
                directory: "out".to_string(),
            },
        }
    }
}

pub async fn load_config(
    path: &str,
) -> std::result::Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// API credentials, read from the environment once at startup. An empty key
/// forces the mock implementation for that collaborator.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub outscraper: String,
    pub screenshotone: String,
    pub anthropic: String,
    pub lovable: String,
    pub instantly: String,
    pub instantly_sending_email: String,
    pub mock_mode: bool,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        let get = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            outscraper: get("OUTSCRAPER_API_KEY"),
            screenshotone: get("SCREENSHOTONE_ACCESS_KEY"),
            anthropic: get("ANTHROPIC_API_KEY"),
            lovable: get("LOVABLE_API_KEY"),
            instantly: get("INSTANTLY_API_KEY"),
            instantly_sending_email: get("INSTANTLY_SENDING_EMAIL"),
            mock_mode: get("LEADPILOT_MOCK_MODE")
                .parse()
                .unwrap_or(true),
        }
    }

    pub fn use_mock(&self, key: &str) -> bool {
        self.mock_mode || key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = Config::default();
        assert_eq!(config.pipeline.min_score_threshold, 50);
        assert!(config.pipeline.batch_limit > 0);
        assert!(!config.pipeline.preview_domain.is_empty());
    }

    #[test]
    fn config_parses_from_yaml() {
        let yaml = r#"
pipeline:
  min_score_threshold: 60
  default_niche: "dentist"
  default_location: "Rotterdam, Netherlands"
  batch_limit: 10
  preview_domain: "preview.example.nl"
sending:
  from_email: "out@example.nl"
  from_name: "Example"
  delay_between_emails_ms: 1000
  require_confirmation_above: 5
logging:
  level: "debug"
  progress_interval: 5
output:
  directory: "data/out"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pipeline.min_score_threshold, 60);
        assert_eq!(config.pipeline.default_niche, "dentist");
        assert_eq!(config.sending.delay_between_emails_ms, 1000);
    }

    #[test]
    fn empty_key_forces_mock() {
        let keys = ApiKeys {
            mock_mode: false,
            ..Default::default()
        };
        assert!(keys.use_mock(&keys.anthropic));

        let keys = ApiKeys {
            anthropic: "sk-test".to_string(),
            mock_mode: false,
            ..Default::default()
        };
        assert!(!keys.use_mock(&keys.anthropic));

        let keys = ApiKeys {
            anthropic: "sk-test".to_string(),
            mock_mode: true,
            ..Default::default()
        };
        assert!(keys.use_mock(&keys.anthropic));
    }
}
