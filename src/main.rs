//! Market digest service: binary entrypoint.
//! Starts the ingestion scheduler and serves the read API on `PORT`.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_digest::bootstrap::build_state;
use market_digest::config::AppConfig;
use market_digest::ingest::scheduler::{spawn_scheduler, SchedulerCfg};
use market_digest::metrics::Metrics;

/// `RUST_LOG` controls the filter (default `info`); `LOG_FORMAT=json` switches
/// to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env().context("reading configuration")?;

    let metrics = match Metrics::init(cfg.ingest_interval.as_secs(), cfg.max_items_per_cycle) {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = ?e, "metrics recorder not installed");
            None
        }
    };

    let state = build_state(&cfg)?;
    let _scheduler = spawn_scheduler(
        state.pipeline.clone(),
        SchedulerCfg {
            interval: cfg.ingest_interval,
        },
    );

    let mut app = market_digest::router(state, &cfg.cors_origins);
    if let Some(m) = &metrics {
        app = app.merge(m.router());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let public = cfg
        .public_base_url
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{}", cfg.port));
    info!(%addr, %public, interval_secs = cfg.ingest_interval.as_secs(), "server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
