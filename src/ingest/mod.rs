// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::event::{build_event, summary_input};
use crate::ingest::types::{RawItem, SourceProvider};
use crate::store::DynEventStore;
use crate::summarize::DynSummarizer;

pub const DEFAULT_MAX_ITEMS_PER_CYCLE: usize = 40;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_cycles_total", "Completed ingestion cycles.");
        describe_counter!(
            "ingest_cycles_skipped_total",
            "Scheduler ticks skipped because a cycle was still running."
        );
        describe_counter!("ingest_events_total", "Raw items parsed from providers.");
        describe_counter!("ingest_dedup_total", "Items removed as duplicates.");
        describe_counter!(
            "ingest_dropped_total",
            "Items dropped for having neither link nor title."
        );
        describe_counter!(
            "ingest_capped_total",
            "Items skipped by the per-cycle processing cap."
        );
        describe_counter!("ingest_inserted_total", "Events persisted.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!("ingest_store_errors_total", "Failed event upserts.");
        describe_counter!(
            "summarizer_fallback_total",
            "Summaries produced by truncation instead of the model."
        );
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_histogram!("ingest_cycle_ms", "Ingestion cycle duration in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub dropped_empty: usize,
    pub duplicates: usize,
}

/// Concatenate batches in arrival order and keep the first item per dedup key.
/// Items with an empty key are dropped.
pub fn merge_dedup<I>(batches: I) -> (Vec<RawItem>, MergeStats)
where
    I: IntoIterator<Item = Vec<RawItem>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep = Vec::new();
    let mut stats = MergeStats::default();

    for item in batches.into_iter().flatten() {
        let key = item.dedup_key();
        if key.is_empty() {
            stats.dropped_empty += 1;
            continue;
        }
        if !seen.insert(key.to_string()) {
            stats.duplicates += 1;
            continue;
        }
        keep.push(item);
    }

    (keep, stats)
}

/// Fail-soft wrapper: provider errors are logged and become an empty batch.
pub async fn fetch_or_empty(provider: &dyn SourceProvider) -> Vec<RawItem> {
    match provider.fetch_latest().await {
        Ok(items) => {
            tracing::debug!(target: "ingest", provider = provider.name(), count = items.len(), "provider fetched");
            items
        }
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, provider = provider.name(), "provider error");
            counter!("ingest_provider_errors_total").increment(1);
            Vec::new()
        }
    }
}

/// Outcome of one ingestion cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub merged: usize,
    pub dropped_empty: usize,
    pub duplicates: usize,
    pub skipped_over_cap: usize,
    pub inserted: usize,
    pub failed: usize,
}

/// fetch → merge → cap → summarize → build → persist.
pub struct Pipeline {
    providers: Vec<Arc<dyn SourceProvider>>,
    summarizer: DynSummarizer,
    store: DynEventStore,
    max_items: usize,
    running: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        providers: Vec<Arc<dyn SourceProvider>>,
        summarizer: DynSummarizer,
        store: DynEventStore,
    ) -> Self {
        Self {
            providers,
            summarizer,
            store,
            max_items: DEFAULT_MAX_ITEMS_PER_CYCLE,
            running: Mutex::new(()),
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Run one cycle, waiting for any in-flight cycle to finish first.
    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.running.lock().await;
        self.run_locked().await
    }

    /// Run one cycle unless one is already in flight.
    pub async fn try_run_cycle(&self) -> Option<CycleReport> {
        let _guard = self.running.try_lock().ok()?;
        Some(self.run_locked().await)
    }

    async fn run_locked(&self) -> CycleReport {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let batches = join_all(self.providers.iter().map(|p| fetch_or_empty(p.as_ref()))).await;
        let fetched: usize = batches.iter().map(Vec::len).sum();

        let (merged, stats) = merge_dedup(batches);
        let merged_len = merged.len();
        let skipped_over_cap = merged_len.saturating_sub(self.max_items);

        let mut report = CycleReport {
            fetched,
            merged: merged_len,
            dropped_empty: stats.dropped_empty,
            duplicates: stats.duplicates,
            skipped_over_cap,
            ..CycleReport::default()
        };

        for item in merged.into_iter().take(self.max_items) {
            let summary = self.summarizer.summarize(&summary_input(&item)).await;
            let event = build_event(&item, summary, chrono::Utc::now());
            match self.store.upsert(&event).await {
                Ok(()) => {
                    report.inserted += 1;
                    tracing::info!(target: "ingest", id = %event.id, model = %event.model_used, "Inserted: {}", event.title);
                }
                Err(e) => {
                    report.failed += 1;
                    counter!("ingest_store_errors_total").increment(1);
                    tracing::warn!(target: "ingest", error = ?e, id = %event.id, backend = self.store.backend(), "event upsert failed");
                }
            }
        }

        // Telemetry
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        counter!("ingest_cycles_total").increment(1);
        counter!("ingest_dedup_total").increment(report.duplicates as u64);
        counter!("ingest_dropped_total").increment(report.dropped_empty as u64);
        counter!("ingest_capped_total").increment(report.skipped_over_cap as u64);
        counter!("ingest_inserted_total").increment(report.inserted as u64);
        histogram!("ingest_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("ingest_pipeline_last_run_ts").set(now as f64);

        tracing::info!(
            target: "ingest",
            fetched = report.fetched,
            merged = report.merged,
            dropped = report.dropped_empty,
            dedup = report.duplicates,
            capped = report.skipped_over_cap,
            inserted = report.inserted,
            failed = report.failed,
            "ingest cycle finished"
        );

        report
    }
}
