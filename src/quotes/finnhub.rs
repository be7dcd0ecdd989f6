use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{Quote, QuoteProvider};

/// Finnhub `/api/v1/quote` payload: c = current, d = change, dp = change %.
#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    #[serde(default)]
    c: Option<f64>,
    #[serde(default)]
    d: Option<f64>,
    #[serde(default)]
    dp: Option<f64>,
}

impl FinnhubQuote {
    /// Finnhub answers unknown symbols with zeros instead of an error.
    fn into_quote(self) -> Option<Quote> {
        let price = self.c.filter(|c| *c > 0.0)?;
        Some(Quote {
            price,
            change: self.d.unwrap_or(0.0),
            change_percent: self.dp,
        })
    }
}

pub struct FinnhubQuotes {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl FinnhubQuotes {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building finnhub quote client")?;
        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch(&self, key: &str, ticker: &str) -> Result<Option<Quote>> {
        let q: FinnhubQuote = self
            .client
            .get(format!("{}/api/v1/quote", self.base_url))
            .query(&[("symbol", ticker), ("token", key)])
            .send()
            .await
            .context("finnhub quote GET")?
            .error_for_status()
            .context("finnhub quote status")?
            .json()
            .await
            .context("finnhub quote payload")?;
        Ok(q.into_quote())
    }
}

#[async_trait]
impl QuoteProvider for FinnhubQuotes {
    async fn quote(&self, ticker: &str) -> Option<Quote> {
        let key = self.api_key.as_deref()?;
        match self.fetch(key, ticker).await {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(target: "quotes", error = ?e, %ticker, "finnhub quote error");
                None
            }
        }
    }

    fn name(&self) -> &str {
        "finnhub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_price_means_no_data() {
        let q: FinnhubQuote = serde_json::from_str(r#"{"c":0,"d":null,"dp":null}"#).unwrap();
        assert!(q.into_quote().is_none());
    }

    #[test]
    fn maps_current_and_change() {
        let q: FinnhubQuote =
            serde_json::from_str(r#"{"c":242.8,"d":-3.15,"dp":-1.28,"h":250,"l":240}"#).unwrap();
        let q = q.into_quote().unwrap();
        assert_eq!(q.price, 242.8);
        assert_eq!(q.change, -3.15);
        assert_eq!(q.change_percent, Some(-1.28));
    }
}
