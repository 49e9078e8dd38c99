use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrapeStatus {
    #[default]
    Pending,
    #[serde(alias = "completed")]
    Scraped,
    Fallback,
    Manual,
    Unavailable,
    Error,
    NoImage,
}

impl ScrapeStatus {
    pub const ALL: [ScrapeStatus; 7] = [
        ScrapeStatus::Pending,
        ScrapeStatus::Scraped,
        ScrapeStatus::Fallback,
        ScrapeStatus::Manual,
        ScrapeStatus::Unavailable,
        ScrapeStatus::Error,
        ScrapeStatus::NoImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Pending => "pending",
            ScrapeStatus::Scraped => "scraped",
            ScrapeStatus::Fallback => "fallback",
            ScrapeStatus::Manual => "manual",
            ScrapeStatus::Unavailable => "unavailable",
            ScrapeStatus::Error => "error",
            ScrapeStatus::NoImage => "no-image",
        }
    }
}

/// One catalog entry. `index` is its position in the catalog file and is
/// assigned on load, never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(skip)]
    pub index: usize,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub current_price: Option<String>,
    #[serde(default)]
    pub scrape_status: ScrapeStatus,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub scraped_at: Option<DateTime<Utc>>,
    /// Fields this tool does not own (category, issue, notes, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogItem {
    #[cfg(test)]
    pub fn new(index: usize, name: &str, url: &str) -> Self {
        CatalogItem {
            index,
            name: name.to_string(),
            url: url.to_string(),
            image_url: None,
            current_price: None,
            scrape_status: ScrapeStatus::Pending,
            scraped_at: None,
            extra: Map::new(),
        }
    }

    /// Set the pass outcome and stamp the time.
    pub fn mark(&mut self, status: ScrapeStatus) {
        self.scrape_status = status;
        self.scraped_at = Some(Utc::now());
    }
}

/// RFC 3339, or a bare `YYYY-MM-DDTHH:MM:SS[.ffffff]` from older scrapers,
/// which is taken as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| de::Error::custom(format!("invalid scrapedAt {:?}: {}", raw, e)))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub items: Vec<CatalogItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Catalog {
    #[cfg(test)]
    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        let mut catalog = Catalog {
            items,
            extra: Map::new(),
        };
        catalog.reindex();
        catalog
    }

    /// Re-derive `index` from position. Called after deserialization.
    pub fn reindex(&mut self) {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.index = i;
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CatalogItem> {
        self.items.get_mut(index)
    }

    pub fn count_status(&self, status: ScrapeStatus) -> usize {
        self.items
            .iter()
            .filter(|i| i.scrape_status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_unknown_fields() {
        let json = r#"{
            "generatedAt": "2025-01-01",
            "items": [
                {"name": "Mochi mix", "url": "https://traderjoes.com/p", "category": "food"},
                {"name": "Link", "url": "https://insta360.com/link", "scrapeStatus": "no-image",
                 "imageUrl": null, "scrapedAt": "2025-02-03T04:05:06.789Z"}
            ]
        }"#;
        let mut catalog: Catalog = serde_json::from_str(json).unwrap();
        catalog.reindex();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.items[1].index, 1);
        assert_eq!(catalog.items[0].scrape_status, ScrapeStatus::Pending);
        assert_eq!(catalog.items[1].scrape_status, ScrapeStatus::NoImage);
        assert!(catalog.items[1].scraped_at.is_some());

        let out = serde_json::to_value(&catalog).unwrap();
        assert_eq!(out["generatedAt"], "2025-01-01");
        assert_eq!(out["items"][0]["category"], "food");
        assert_eq!(out["items"][1]["scrapeStatus"], "no-image");
        assert!(out["items"][0].get("index").is_none());
    }

    #[test]
    fn reads_items_from_older_scrapers() {
        let json = r#"{"items": [
            {"name": "Cube", "url": "https://a.com/c", "scrapeStatus": "completed",
             "scrapedAt": "2025-02-03T04:05:06.789123"},
            {"name": "Dial", "url": "https://a.com/d", "scrapeStatus": "error",
             "scrapedAt": "2025-02-03T04:05:06"},
            {"name": "Pin", "url": "https://a.com/p", "scrapedAt": null}
        ]}"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();

        assert_eq!(catalog.items[0].scrape_status, ScrapeStatus::Scraped);
        assert_eq!(
            catalog.items[0].scraped_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-02-03T04:05:06.789123+00:00")
        );
        assert_eq!(
            catalog.items[1].scraped_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-02-03T04:05:06+00:00")
        );
        assert_eq!(catalog.items[2].scraped_at, None);

        let out = serde_json::to_value(&catalog).unwrap();
        assert_eq!(out["items"][0]["scrapeStatus"], "scraped");
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        let json = r#"{"items": [{"name": "x", "url": "u", "scrapedAt": "yesterday"}]}"#;
        assert!(serde_json::from_str::<Catalog>(json).is_err());
    }

    #[test]
    fn mark_stamps_time() {
        let mut item = CatalogItem::new(0, "x", "https://example.com");
        item.mark(ScrapeStatus::Unavailable);
        assert_eq!(item.scrape_status, ScrapeStatus::Unavailable);
        assert!(item.scraped_at.is_some());
    }
}
