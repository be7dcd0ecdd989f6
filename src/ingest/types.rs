// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub source: String, // feed or provider name, e.g. "finnhub"
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub description: String, // RSS description or provider summary
}

impl RawItem {
    /// Dedup key: trimmed link, else trimmed title. Empty means unaddressable.
    pub fn dedup_key(&self) -> &str {
        let link = self.link.trim();
        if link.is_empty() {
            self.title.trim()
        } else {
            link
        }
    }
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &str;
}
