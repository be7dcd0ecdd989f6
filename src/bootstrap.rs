// src/bootstrap.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::ingest::config::load_feeds;
use crate::ingest::providers::{finnhub_news::FinnhubNewsProvider, rss::RssProvider};
use crate::ingest::types::SourceProvider;
use crate::ingest::Pipeline;
use crate::market::MarketSnapshot;
use crate::quotes::{
    alpha_vantage::AlphaVantageQuotes, finnhub::FinnhubQuotes, QuoteChain, QuoteProvider,
};
use crate::store::memory::MemoryStore;
use crate::store::supabase::SupabaseStore;
use crate::store::{DynEventStore, DynMarketStore};
use crate::summarize::{DynSummarizer, HfSummarizer};

/// Wire every component from `cfg`. Only malformed configuration fails;
/// missing keys disable their feature.
pub fn build_state(cfg: &AppConfig) -> Result<AppState> {
    let (events, market) = build_stores(cfg)?;
    let summarizer = build_summarizer(cfg)?;
    let providers = build_providers(cfg)?;

    let pipeline = Pipeline::new(providers, summarizer.clone(), events.clone())
        .with_max_items(cfg.max_items_per_cycle);
    info!(
        target: "ingest",
        providers = ?pipeline.provider_names(),
        backend = events.backend(),
        max_items = cfg.max_items_per_cycle,
        "pipeline ready"
    );

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        events,
        market,
        quotes: Arc::new(build_quotes(cfg)?),
        summarizer,
    })
}

fn build_stores(cfg: &AppConfig) -> Result<(DynEventStore, DynMarketStore)> {
    if let Some(sb) = &cfg.supabase {
        let store = Arc::new(SupabaseStore::new(&sb.url, &sb.key, cfg.source_timeout)?);
        info!(target: "store", url = %sb.url, "using supabase store");
        let events: DynEventStore = store.clone();
        let market: DynMarketStore = store;
        return Ok((events, market));
    }

    warn!(target: "store", "SUPABASE_URL/SUPABASE_KEY not set, events kept in memory only");
    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &cfg.market_snapshot_path {
        let snapshot = MarketSnapshot::load_from_file(path)?;
        info!(
            target: "store",
            stocks = snapshot.stocks.len(),
            calendar = snapshot.calendar.len(),
            "market snapshot loaded"
        );
        store.load_snapshot(snapshot);
    }
    let events: DynEventStore = store.clone();
    let market: DynMarketStore = store;
    Ok((events, market))
}

fn build_summarizer(cfg: &AppConfig) -> Result<DynSummarizer> {
    let s = HfSummarizer::new(
        cfg.huggingface_api_key.clone(),
        &cfg.hf_model,
        &cfg.hf_base_url,
        cfg.summary_timeout,
    )?;
    if s.is_enabled() {
        info!(target: "summarize", model = s.model(), "hosted summarizer enabled");
    } else {
        warn!(target: "summarize", "HUGGINGFACE_API_KEY not set, summaries fall back to truncation");
    }
    Ok(Arc::new(s))
}

fn build_providers(cfg: &AppConfig) -> Result<Vec<Arc<dyn SourceProvider>>> {
    let feeds = load_feeds(cfg.feeds_path.as_deref()).context("loading feed list")?;

    let mut providers: Vec<Arc<dyn SourceProvider>> = Vec::with_capacity(feeds.len() + 1);
    for feed in &feeds {
        providers.push(Arc::new(RssProvider::from_url(
            &feed.name,
            &feed.url,
            cfg.source_timeout,
        )?));
    }

    if cfg.finnhub_api_key.is_none() {
        info!(target: "ingest", "FINNHUB_API_KEY not set, headline source disabled");
    }
    providers.push(Arc::new(FinnhubNewsProvider::new(
        cfg.finnhub_api_key.clone(),
        &cfg.finnhub_base_url,
        cfg.source_timeout,
    )?));
    Ok(providers)
}

fn build_quotes(cfg: &AppConfig) -> Result<QuoteChain> {
    let primary: Arc<dyn QuoteProvider> = Arc::new(AlphaVantageQuotes::new(
        cfg.alphavantage_api_key.clone(),
        &cfg.alphavantage_base_url,
        cfg.source_timeout,
    )?);
    let fallback: Arc<dyn QuoteProvider> = Arc::new(FinnhubQuotes::new(
        cfg.finnhub_api_key.clone(),
        &cfg.finnhub_base_url,
        cfg.source_timeout,
    )?);
    Ok(QuoteChain::new(vec![primary, fallback]))
}
