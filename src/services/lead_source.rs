use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::LeadSource;
use crate::models::{BusinessRecord, Result};

const OUTSCRAPER_BASE_URL: &str = "https://api.app.outscraper.com";

/// Google Maps business listings via the Outscraper API.
pub struct OutscraperSource {
    api_key: String,
    client: Client,
}

impl OutscraperSource {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LeadSource for OutscraperSource {
    async fn find(
        &self,
        niche: &str,
        location: &str,
        limit: usize,
    ) -> Result<Vec<BusinessRecord>> {
        let url = format!("{}/maps/search-v3", OUTSCRAPER_BASE_URL);
        debug!("Querying Outscraper: {} {} (limit {})", niche, location, limit);

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .query(&[
                ("query", format!("{} {}", niche, location)),
                ("limit", limit.to_string()),
                ("language", "nl".to_string()),
                ("region", "NL".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Outscraper error {}: {}", status, body).into());
        }

        let data: serde_json::Value = response.json().await?;
        let city = location.split(',').next().unwrap_or("").trim().to_string();

        let items = data
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        let records = items
            .iter()
            .map(|item| {
                let get_str = |key: &str| {
                    item.get(key)
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                };
                BusinessRecord {
                    business_name: get_str("name").unwrap_or_default(),
                    business_type: niche.to_string(),
                    address: get_str("full_address").unwrap_or_default(),
                    city: city.clone(),
                    phone: get_str("phone"),
                    email: get_str("email"),
                    // A garbage site value is the same as no site at all.
                    website_url: get_str("site").filter(|s| url::Url::parse(s).is_ok()),
                    maps_url: get_str("google_maps_url").unwrap_or_default(),
                    rating: item.get("rating").and_then(|v| v.as_f64()),
                    reviews_count: item.get("reviews").and_then(|v| v.as_i64()),
                }
            })
            .collect::<Vec<_>>();

        info!("Outscraper returned {} listings", records.len());
        Ok(records)
    }
}

// name, type, phone, website (None = no website, the hottest kind of lead),
// rating, reviews
const MOCK_BUSINESSES: &[(&str, &str, &str, Option<&str>, f64, i64)] = &[
    ("Van der Berg Loodgietersbedrijf", "plumber", "+31 20 123 4567", Some("http://vandenbergloodgieter.nl"), 4.2, 23),
    ("Bakkerij De Gouden Korst", "bakery", "+31 20 234 5678", Some("http://degoudenkorst.nl"), 4.7, 89),
    ("Kapper Studio Mooi", "hair_salon", "+31 10 345 6789", None, 3.9, 12),
    ("Tandarts Praktijk Jansen", "dentist", "+31 30 456 7890", Some("http://tandartsjansen.nl"), 4.1, 45),
    ("Schildersbedrijf Kleurrijk", "painter", "+31 70 567 8901", Some("http://kleurrijkschilders.nl"), 3.5, 8),
    ("Restaurant De Smakelijke Hoek", "restaurant", "+31 20 678 9012", Some("http://desmakelijkehoek.nl"), 4.4, 156),
    ("Fietsenmaker Pedaal", "bike_repair", "+31 30 789 0123", None, 4.6, 34),
    ("Schoonmaakbedrijf Fris", "cleaning", "+31 10 890 1234", Some("http://frischoonmaak.nl"), 3.2, 5),
    ("Elektricien Vonk", "electrician", "+31 20 901 2345", Some("http://vonkelektro.nl"), 4.0, 19),
    ("Bloemist Het Boeket", "florist", "+31 70 012 3456", None, 4.8, 67),
    ("Garage Snelle Wielen", "auto_repair", "+31 10 111 2222", Some("http://snellewielen.nl"), 3.8, 28),
    ("Dierenarts De Dierenvriend", "veterinarian", "+31 30 222 3333", Some("http://dedierenvriend.nl"), 4.5, 72),
    ("Timmerman Houtwerk", "carpenter", "+31 20 333 4444", None, 4.3, 15),
    ("Advocaat De Recht", "lawyer", "+31 70 444 5555", Some("http://derecht-advocaten.nl"), 3.7, 11),
    ("Fysiotherapie Gezond Bewegen", "physiotherapy", "+31 10 555 6666", Some("http://gezondbewegen-fysio.nl"), 4.6, 93),
];

/// Development stand-in: realistic Dutch businesses, no network.
pub struct MockLeadSource;

impl MockLeadSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockLeadSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeadSource for MockLeadSource {
    async fn find(
        &self,
        _niche: &str,
        location: &str,
        limit: usize,
    ) -> Result<Vec<BusinessRecord>> {
        let city = location.split(',').next().unwrap_or("").trim().to_string();

        let records = MOCK_BUSINESSES
            .iter()
            .take(limit)
            .map(|(name, biz_type, phone, website, rating, reviews)| BusinessRecord {
                business_name: name.to_string(),
                business_type: biz_type.to_string(),
                address: format!("Voorbeeldstraat {}, {}", fastrand::u32(1..=200), city),
                city: city.clone(),
                phone: Some(phone.to_string()),
                email: None,
                website_url: website.map(|w| w.to_string()),
                maps_url: format!(
                    "https://maps.google.com/?cid={}",
                    fastrand::u64(10u64.pow(15)..10u64.pow(16))
                ),
                rating: Some(*rating),
                reviews_count: Some(*reviews),
            })
            .collect();

        Ok(records)
    }
}
