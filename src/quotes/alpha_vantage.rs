use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{parse_percent, Quote, QuoteProvider};

pub const DEFAULT_ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co";

#[derive(Debug, Deserialize)]
struct GlobalQuoteResp {
    #[serde(rename = "Global Quote", default)]
    global_quote: Option<HashMap<String, String>>,
}

/// Alpha Vantage `GLOBAL_QUOTE` lookups.
pub struct AlphaVantageQuotes {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl AlphaVantageQuotes {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building alpha vantage http client")?;
        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch(&self, key: &str, ticker: &str) -> Result<Option<Quote>> {
        let resp: GlobalQuoteResp = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", ticker), ("apikey", key)])
            .send()
            .await
            .context("alpha vantage GET")?
            .error_for_status()
            .context("alpha vantage status")?
            .json()
            .await
            .context("alpha vantage payload")?;
        Ok(resp.global_quote.as_ref().and_then(map_global_quote))
    }
}

/// Empty `"Global Quote": {}` (unknown symbol) or unparsable price → `None`.
fn map_global_quote(q: &HashMap<String, String>) -> Option<Quote> {
    let price = q.get("05. price")?.trim().parse::<f64>().ok()?;
    let change = q
        .get("09. change")
        .and_then(|c| c.trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    let change_percent = q.get("10. change percent").and_then(|p| parse_percent(p));
    Some(Quote {
        price,
        change,
        change_percent,
    })
}

#[async_trait]
impl QuoteProvider for AlphaVantageQuotes {
    async fn quote(&self, ticker: &str) -> Option<Quote> {
        let key = self.api_key.as_deref()?;
        match self.fetch(key, ticker).await {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(target: "quotes", error = ?e, %ticker, "alpha vantage quote error");
                None
            }
        }
    }

    fn name(&self) -> &str {
        "alphavantage"
    }
}
