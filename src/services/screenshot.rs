use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::Screenshotter;

const SCREENSHOTONE_URL: &str = "https://api.screenshotone.com/take";

/// Website screenshots via ScreenshotOne, saved as PNG under the output
/// directory so the scorer can attach them.
pub struct ScreenshotOne {
    access_key: String,
    output_dir: String,
    client: Client,
}

impl ScreenshotOne {
    pub fn new(access_key: String, output_dir: String) -> Self {
        Self {
            access_key,
            output_dir,
            client: Client::new(),
        }
    }

    fn screenshot_path(&self, lead_id: i64) -> PathBuf {
        PathBuf::from(&self.output_dir)
            .join("screenshots")
            .join(format!("{}.png", lead_id))
    }
}

#[async_trait]
impl Screenshotter for ScreenshotOne {
    async fn capture(&self, lead_id: i64, website_url: &str) -> Option<String> {
        debug!("Capturing screenshot for lead {}: {}", lead_id, website_url);

        let response = self
            .client
            .get(SCREENSHOTONE_URL)
            .query(&[
                ("access_key", self.access_key.as_str()),
                ("url", website_url),
                ("viewport_width", "1280"),
                ("viewport_height", "800"),
                ("format", "png"),
                ("full_page", "false"),
                ("delay", "3"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("Screenshot failed for lead {}: HTTP {}", lead_id, r.status());
                return None;
            }
            Err(e) => {
                warn!("Screenshot failed for lead {}: {}", lead_id, e);
                return None;
            }
        };

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Screenshot body read failed for lead {}: {}", lead_id, e);
                return None;
            }
        };

        let path = self.screenshot_path(lead_id);
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("Could not create screenshot dir: {}", e);
                return None;
            }
        }
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            warn!("Could not write screenshot for lead {}: {}", lead_id, e);
            return None;
        }

        Some(path.to_string_lossy().to_string())
    }
}

/// Development stand-in: hands back a deterministic path, touches nothing.
pub struct MockScreenshotter;

impl MockScreenshotter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockScreenshotter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Screenshotter for MockScreenshotter {
    async fn capture(&self, lead_id: i64, _website_url: &str) -> Option<String> {
        Some(format!("out/screenshots/mock-{}.png", lead_id))
    }
}
