// src/ingest/providers/rss.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::normalize_text;
use crate::ingest::types::{RawItem, SourceProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    #[serde(default)]
    channel: Option<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

// Namespaced siblings (`media:title`, `media:description`, `atom:link`) share
// the local name, so each text field collects every occurrence.
#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    link: Vec<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    description: Vec<String>,
}

/// First value with non-whitespace content, in document order.
fn first_non_empty(values: &[String]) -> &str {
    values
        .iter()
        .map(String::as_str)
        .find(|v| !v.trim().is_empty())
        .unwrap_or_default()
}

/// RFC 2822 (RSS standard), with RFC 3339 accepted as a fallback.
pub fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc2822) {
        return DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond());
    }
    DateTime::parse_from_rfc2822(ts)
        .or_else(|_| DateTime::parse_from_rfc3339(ts))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct RssProvider {
    name: String,
    mode: Mode,
}

enum Mode {
    // Owned copy so tests can feed any &str.
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssProvider {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(name: &str, url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("market-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("building rss http client")?;
        Ok(Self {
            name: name.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        })
    }

    pub fn parse_items_from_str(source: &str, s: &str) -> Result<Vec<RawItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let items = rss.channel.map(|c| c.item).unwrap_or_default();
        let mut out = Vec::with_capacity(items.len());
        for it in items {
            out.push(RawItem {
                source: source.to_string(),
                title: normalize_text(first_non_empty(&it.title)),
                link: first_non_empty(&it.link).trim().to_string(),
                published_at: it.pub_date.as_deref().and_then(parse_pub_date),
                description: normalize_text(first_non_empty(&it.description)),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(&self.name, s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("rss GET {url}"))?
                    .error_for_status()
                    .with_context(|| format!("rss GET {url} status"))?
                    .text()
                    .await
                    .context("rss body")?;
                Self::parse_items_from_str(&self.name, &body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
