//! # Store
//! Persistence gateway. `EventStore` upserts and queries Events keyed by `id`;
//! `MarketStore` serves the externally-owned stock and calendar snapshots.
//!
//! Backends: [`memory::MemoryStore`] and [`supabase::SupabaseStore`].

pub mod memory;
pub mod supabase;

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::event::{Event, ImpactLevel};
use crate::market::{CalendarEvent, CalendarFilter, Stock};

/// Event query. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventFilter {
    pub since: Option<DateTime<Utc>>,
    #[serde(rename = "impact")]
    pub impact_level: Option<ImpactLevel>,
    pub sector: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, e: &Event) -> bool {
        self.since.is_none_or(|s| e.timestamp >= s)
            && self.impact_level.is_none_or(|i| e.impact_level == Some(i))
            && self.sector.as_deref().is_none_or(|s| e.has_sector(s))
    }
}

#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Insert, or replace the stored record with the same `id`.
    async fn upsert(&self, event: &Event) -> Result<()>;
    /// Matching events, newest first.
    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>>;
    fn backend(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait MarketStore: Send + Sync {
    async fn stock(&self, ticker: &str) -> Result<Option<Stock>>;
    /// Matching entries, date ascending.
    async fn calendar(&self, filter: &CalendarFilter) -> Result<Vec<CalendarEvent>>;
}

pub type DynEventStore = Arc<dyn EventStore>;
pub type DynMarketStore = Arc<dyn MarketStore>;

/// Newest first.
pub(crate) fn sort_newest_first(events: &mut [Event]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
