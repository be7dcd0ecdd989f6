//! Stock snapshots and macro calendar entries. Owned externally; this service
//! only reads them.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::event::ImpactLevel;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    #[serde(default)]
    pub pe: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<String>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub value: f64,
    pub signal: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Technical {
    #[serde(default)]
    pub ma50: Option<f64>,
    #[serde(default)]
    pub ma200: Option<f64>,
    #[serde(default)]
    pub rsi: Option<f64>,
    #[serde(default)]
    pub macd: Option<Macd>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
    #[serde(default)]
    pub fundamentals: Fundamentals,
    #[serde(default)]
    pub technical: Technical,
    #[serde(default)]
    pub ai_summary: String,
    #[serde(default)]
    pub sparkline: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub date: NaiveDate,
    pub country: String,
    pub event: String,
    pub importance: ImpactLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default)]
    pub ai_summary: String,
    #[serde(default)]
    pub affected_markets: Vec<String>,
}

/// Calendar query; bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CalendarFilter {
    pub country: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl CalendarFilter {
    pub fn matches(&self, e: &CalendarEvent) -> bool {
        self.country.as_deref().is_none_or(|c| e.country == c)
            && self.from.is_none_or(|f| e.date >= f)
            && self.to.is_none_or(|t| e.date <= t)
    }
}

/// Seed content for the in-memory market store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub stocks: Vec<Stock>,
    #[serde(default)]
    pub calendar: Vec<CalendarEvent>,
}

impl MarketSnapshot {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading market snapshot {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("parsing market snapshot {}", path.display()))
    }
}
