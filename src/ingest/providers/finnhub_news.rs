// src/ingest/providers/finnhub_news.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use metrics::counter;
use serde::Deserialize;
use serde_json::Value;

use crate::ingest::types::{RawItem, SourceProvider};

pub const DEFAULT_FINNHUB_BASE_URL: &str = "https://finnhub.io";

#[derive(Debug, Deserialize)]
struct NewsRow {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    datetime: Option<i64>,
    #[serde(default)]
    summary: String,
}

/// General market headlines from Finnhub. Without a key the source is disabled.
pub struct FinnhubNewsProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl FinnhubNewsProvider {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building finnhub http client")?;
        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Maps the provider payload; anything other than an array is empty.
    pub fn parse_rows(body: Value) -> Vec<RawItem> {
        let Value::Array(rows) = body else {
            return Vec::new();
        };
        rows.into_iter()
            .filter_map(|v| serde_json::from_value::<NewsRow>(v).ok())
            .map(|r| RawItem {
                source: "finnhub".to_string(),
                title: r.headline.trim().to_string(),
                link: r.url.trim().to_string(),
                published_at: r
                    .datetime
                    .filter(|t| *t > 0)
                    .and_then(|t| DateTime::from_timestamp(t, 0)),
                description: r.summary.trim().to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl SourceProvider for FinnhubNewsProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        let Some(key) = self.api_key.as_deref() else {
            tracing::debug!(target: "ingest", "finnhub news disabled (no FINNHUB_API_KEY)");
            return Ok(Vec::new());
        };

        let body: Value = self
            .client
            .get(format!("{}/api/v1/news", self.base_url))
            .query(&[("category", "general"), ("token", key)])
            .send()
            .await
            .context("finnhub news GET")?
            .error_for_status()
            .context("finnhub news status")?
            .json()
            .await
            .context("finnhub news payload")?;

        let out = Self::parse_rows(body);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &str {
        "finnhub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_provider_schema() {
        let body = json!([
            { "headline": "Stocks rally", "url": "https://f/1", "datetime": 1761314700, "summary": "S&P up" },
            { "headline": "No date", "url": "https://f/2", "datetime": 0 }
        ]);
        let items = FinnhubNewsProvider::parse_rows(body);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Stocks rally");
        assert_eq!(items[0].description, "S&P up");
        assert_eq!(
            items[0].published_at.map(|t| t.timestamp()),
            Some(1761314700)
        );
        assert!(items[1].published_at.is_none());
        assert!(items[1].description.is_empty());
    }

    #[test]
    fn non_array_payload_is_empty() {
        assert!(FinnhubNewsProvider::parse_rows(json!({ "error": "bad token" })).is_empty());
    }

    #[tokio::test]
    async fn missing_key_disables_source() {
        let p = FinnhubNewsProvider::new(None, "http://127.0.0.1:9", Duration::from_millis(50))
            .unwrap();
        assert!(p.fetch_latest().await.unwrap().is_empty());
    }
}
