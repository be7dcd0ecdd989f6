//! In-process store. Used when no datastore is configured, and in tests.

use std::collections::HashMap;

use anyhow::Result;
use parking_lot::RwLock;

use super::{sort_newest_first, EventFilter, EventStore, MarketStore};
use crate::event::Event;
use crate::market::{CalendarEvent, CalendarFilter, MarketSnapshot, Stock};

#[derive(Debug, Default)]
pub struct MemoryStore {
    events: RwLock<HashMap<String, Event>>,
    stocks: RwLock<HashMap<String, Stock>>,
    calendar: RwLock<Vec<CalendarEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: MarketSnapshot) -> Self {
        let store = Self::new();
        store.load_snapshot(snapshot);
        store
    }

    /// Replace stocks and calendar with `snapshot`.
    pub fn load_snapshot(&self, snapshot: MarketSnapshot) {
        let stocks = snapshot
            .stocks
            .into_iter()
            .map(|s| (s.ticker.to_ascii_uppercase(), s))
            .collect();
        let mut calendar = snapshot.calendar;
        calendar.sort_by(|a, b| a.date.cmp(&b.date));
        *self.stocks.write() = stocks;
        *self.calendar.write() = calendar;
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryStore {
    async fn upsert(&self, event: &Event) -> Result<()> {
        self.events.write().insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut out: Vec<Event> = self
            .events
            .read()
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[async_trait::async_trait]
impl MarketStore for MemoryStore {
    async fn stock(&self, ticker: &str) -> Result<Option<Stock>> {
        Ok(self
            .stocks
            .read()
            .get(&ticker.trim().to_ascii_uppercase())
            .cloned())
    }

    async fn calendar(&self, filter: &CalendarFilter) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .calendar
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}
