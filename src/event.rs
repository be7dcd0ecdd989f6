//! # Events
//! Canonical `Event` record plus the builder that turns a merged, summarized
//! `RawItem` into one.
//!
//! Field names serialize in snake_case, the same shape the dashboard reads
//! and the datastore persists.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::ingest::providers::rss::parse_pub_date;
use crate::ingest::types::RawItem;
use crate::summarize::SummaryResult;

/// Upper bound (in chars) of text handed to the summarizer.
pub const MAX_SUMMARY_INPUT_CHARS: usize = 3000;

const ID_PREFIX: &str = "evt-";
const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

impl ImpactLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::High => "High",
            ImpactLevel::Medium => "Medium",
            ImpactLevel::Low => "Low",
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provenance entry: where the story was seen and when.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "ts", alias = "timestamp", deserialize_with = "lenient_ts")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Provenance {
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similar_event_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub impact_level: Option<ImpactLevel>,
    /// 0..=100 when populated.
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub affected_sectors: Option<Vec<String>>,
    #[serde(default)]
    pub affected_symbols: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<SourceRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reasoning: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model_used: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provenance: Provenance,
    pub timestamp: DateTime<Utc>,
}

/// Stored rows may carry `null` where the record has a plain default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// RFC 3339, or the raw RFC 2822 `pubDate` older rows stored verbatim.
fn lenient_ts<'de, D>(d: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    parse_pub_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unparsable source timestamp {raw:?}")))
}

impl Event {
    pub fn has_sector(&self, sector: &str) -> bool {
        self.affected_sectors
            .as_deref()
            .is_some_and(|s| s.iter().any(|x| x == sector))
    }
}

/// `evt-` followed by 9 random base-36 characters.
pub fn new_event_id() -> String {
    let mut rng = rand::rng();
    let mut id = String::with_capacity(ID_PREFIX.len() + ID_SUFFIX_LEN);
    id.push_str(ID_PREFIX);
    for _ in 0..ID_SUFFIX_LEN {
        id.push(BASE36[rng.random_range(0..BASE36.len())] as char);
    }
    id
}

/// Char-safe prefix of `s` with at most `max` chars.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Text handed to the summarizer: description if present, else title.
pub fn summary_input(item: &RawItem) -> String {
    let desc = item.description.trim();
    let text = if desc.is_empty() {
        item.title.trim()
    } else {
        desc
    };
    truncate_chars(text, MAX_SUMMARY_INPUT_CHARS)
}

/// Map a merged item and its summary into the canonical record.
/// Only `id` is non-deterministic.
pub fn build_event(item: &RawItem, summary: SummaryResult, now: DateTime<Utc>) -> Event {
    let ts = item.published_at.unwrap_or(now);
    let title = if item.title.trim().is_empty() {
        item.link.trim().to_string()
    } else {
        item.title.trim().to_string()
    };

    Event {
        id: new_event_id(),
        title,
        summary: summary.summary,
        sentiment: None,
        impact_level: None,
        probability: None,
        affected_sectors: None,
        affected_symbols: None,
        sources: vec![SourceRef {
            url: item.link.trim().to_string(),
            name: item.source.clone(),
            timestamp: ts,
        }],
        reasoning: format!("Auto-summarized by {}", summary.model),
        model_used: summary.model,
        provenance: Provenance {
            source_count: 1,
            ..Provenance::default()
        },
        timestamp: ts,
    }
}
