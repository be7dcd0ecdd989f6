//! # Quotes
//! Live quote lookups behind a common trait, chained so a secondary provider
//! answers when the primary has nothing for a ticker.

pub mod alpha_vantage;
pub mod finnhub;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Normalized quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub price: f64,
    pub change: f64,
    pub change_percent: Option<f64>,
}

#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    /// `None` when the key is absent, the upstream fails, or has no data.
    async fn quote(&self, ticker: &str) -> Option<Quote>;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcedQuote {
    pub source: String,
    pub quote: Quote,
}

/// Ordered providers; the first one with data wins.
#[derive(Clone, Default)]
pub struct QuoteChain {
    providers: Vec<Arc<dyn QuoteProvider>>,
}

impl QuoteChain {
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        Self { providers }
    }

    pub async fn lookup(&self, ticker: &str) -> Option<SourcedQuote> {
        let ticker = ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return None;
        }
        for p in &self.providers {
            if let Some(quote) = p.quote(&ticker).await {
                return Some(SourcedQuote {
                    source: p.name().to_string(),
                    quote,
                });
            }
            tracing::debug!(target: "quotes", provider = p.name(), %ticker, "no quote, trying next provider");
        }
        None
    }
}

/// "1.33%" or "1.33" → 1.33
pub(crate) fn parse_percent(s: &str) -> Option<f64> {
    s.trim().trim_end_matches('%').trim().parse::<f64>().ok()
}
