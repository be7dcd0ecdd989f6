//! Supabase/PostgREST backend. Tables: `events`, `stocks`, `calendar_events`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::SecondsFormat;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{EventFilter, EventStore, MarketStore};
use crate::event::{truncate_chars, Event};
use crate::market::{CalendarEvent, CalendarFilter, Stock};

const EVENTS: &str = "events";
const STOCKS: &str = "stocks";
const CALENDAR: &str = "calendar_events";

pub struct SupabaseStore {
    rest_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building supabase http client")?;
        Ok(Self {
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{}", self.rest_url, name)
    }

    async fn get_rows<T: DeserializeOwned>(&self, rb: RequestBuilder, what: &str) -> Result<Vec<T>> {
        let resp = self
            .authed(rb)
            .send()
            .await
            .with_context(|| format!("supabase {what} request"))?;
        let resp = check_status(resp, what).await?;
        resp.json()
            .await
            .with_context(|| format!("supabase {what} payload"))
    }
}

async fn check_status(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!(
        "supabase {what} failed with {status}: {}",
        truncate_chars(&body, 300)
    ))
}

/// PostgREST query params for an event filter.
pub fn event_query_params(filter: &EventFilter) -> Vec<(String, String)> {
    let mut q = vec![
        ("select".to_string(), "*".to_string()),
        ("order".to_string(), "timestamp.desc".to_string()),
    ];
    if let Some(impact) = filter.impact_level {
        q.push(("impact_level".into(), format!("eq.{impact}")));
    }
    if let Some(since) = filter.since {
        q.push((
            "timestamp".into(),
            format!("gte.{}", since.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ));
    }
    if let Some(sector) = filter.sector.as_deref() {
        q.push(("affected_sectors".into(), format!("cs.{{\"{sector}\"}}")));
    }
    q
}

/// PostgREST query params for a calendar filter.
pub fn calendar_query_params(filter: &CalendarFilter) -> Vec<(String, String)> {
    let mut q = vec![
        ("select".to_string(), "*".to_string()),
        ("order".to_string(), "date.asc".to_string()),
    ];
    if let Some(country) = filter.country.as_deref() {
        q.push(("country".into(), format!("eq.{country}")));
    }
    if let Some(from) = filter.from {
        q.push(("date".into(), format!("gte.{from}")));
    }
    if let Some(to) = filter.to {
        q.push(("date".into(), format!("lte.{to}")));
    }
    q
}

#[async_trait::async_trait]
impl EventStore for SupabaseStore {
    async fn upsert(&self, event: &Event) -> Result<()> {
        let resp = self
            .authed(self.client.post(self.table(EVENTS)))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[event])
            .send()
            .await
            .context("supabase upsert request")?;
        check_status(resp, "upsert").await?;
        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let rb = self
            .client
            .get(self.table(EVENTS))
            .query(&event_query_params(filter));
        self.get_rows(rb, "events query").await
    }

    fn backend(&self) -> &'static str {
        "supabase"
    }
}

#[async_trait::async_trait]
impl MarketStore for SupabaseStore {
    async fn stock(&self, ticker: &str) -> Result<Option<Stock>> {
        let ticker = ticker.trim().to_ascii_uppercase();
        let rb = self.client.get(self.table(STOCKS)).query(&[
            ("select", "*".to_string()),
            ("ticker", format!("eq.{ticker}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<Stock> = self.get_rows(rb, "stock lookup").await?;
        Ok(rows.into_iter().next())
    }

    async fn calendar(&self, filter: &CalendarFilter) -> Result<Vec<CalendarEvent>> {
        let rb = self
            .client
            .get(self.table(CALENDAR))
            .query(&calendar_query_params(filter));
        self.get_rows(rb, "calendar query").await
    }
}
