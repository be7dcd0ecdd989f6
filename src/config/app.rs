// src/config/app.rs
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::ingest::providers::finnhub_news::DEFAULT_FINNHUB_BASE_URL;
use crate::ingest::scheduler::DEFAULT_INTERVAL_SECS;
use crate::ingest::DEFAULT_MAX_ITEMS_PER_CYCLE;
use crate::quotes::alpha_vantage::DEFAULT_ALPHA_VANTAGE_BASE_URL;
use crate::summarize::{DEFAULT_HF_BASE_URL, DEFAULT_HF_MODEL};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

/// Process configuration, read once at start-up and passed to constructors.
/// Missing optional keys only disable the feature that needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub public_base_url: Option<String>,

    pub supabase: Option<SupabaseConfig>,
    pub finnhub_api_key: Option<String>,
    pub alphavantage_api_key: Option<String>,
    pub huggingface_api_key: Option<String>,
    pub hf_model: String,

    pub hf_base_url: String,
    pub finnhub_base_url: String,
    pub alphavantage_base_url: String,

    pub ingest_interval: Duration,
    pub max_items_per_cycle: usize,
    pub source_timeout: Duration,
    pub summary_timeout: Duration,

    pub feeds_path: Option<PathBuf>,
    pub market_snapshot_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            cors_origins: Vec::new(),
            public_base_url: None,
            supabase: None,
            finnhub_api_key: None,
            alphavantage_api_key: None,
            huggingface_api_key: None,
            hf_model: DEFAULT_HF_MODEL.to_string(),
            hf_base_url: DEFAULT_HF_BASE_URL.to_string(),
            finnhub_base_url: DEFAULT_FINNHUB_BASE_URL.to_string(),
            alphavantage_base_url: DEFAULT_ALPHA_VANTAGE_BASE_URL.to_string(),
            ingest_interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            max_items_per_cycle: DEFAULT_MAX_ITEMS_PER_CYCLE,
            source_timeout: Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS),
            summary_timeout: Duration::from_secs(DEFAULT_SUMMARY_TIMEOUT_SECS),
            feeds_path: None,
            market_snapshot_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let d = Self::default();

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
            (Some(url), Some(key)) => Some(SupabaseConfig { url, key }),
            _ => None,
        };

        let cors_origins = get("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port: parse_or(get("PORT"), "PORT", d.port)?,
            cors_origins,
            public_base_url: get("PUBLIC_BASE_URL"),
            supabase,
            finnhub_api_key: get("FINNHUB_API_KEY"),
            alphavantage_api_key: get("ALPHAVANTAGE_API_KEY"),
            huggingface_api_key: get("HUGGINGFACE_API_KEY"),
            hf_model: get("HF_MODEL").unwrap_or(d.hf_model),
            hf_base_url: get("HF_BASE_URL").unwrap_or(d.hf_base_url),
            finnhub_base_url: get("FINNHUB_BASE_URL").unwrap_or(d.finnhub_base_url),
            alphavantage_base_url: get("ALPHAVANTAGE_BASE_URL")
                .unwrap_or(d.alphavantage_base_url),
            ingest_interval: secs_or(
                get("INGEST_INTERVAL_SECS"),
                "INGEST_INTERVAL_SECS",
                d.ingest_interval,
            )?,
            max_items_per_cycle: count_or(
                get("INGEST_MAX_ITEMS"),
                "INGEST_MAX_ITEMS",
                d.max_items_per_cycle,
            )?,
            source_timeout: secs_or(
                get("SOURCE_TIMEOUT_SECS"),
                "SOURCE_TIMEOUT_SECS",
                d.source_timeout,
            )?,
            summary_timeout: secs_or(
                get("SUMMARY_TIMEOUT_SECS"),
                "SUMMARY_TIMEOUT_SECS",
                d.summary_timeout,
            )?,
            feeds_path: get("FEEDS_PATH").map(PathBuf::from),
            market_snapshot_path: get("MARKET_SNAPSHOT_PATH").map(PathBuf::from),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v.parse::<T>().with_context(|| format!("invalid {key}={v}")),
        None => Ok(default),
    }
}

/// Whole seconds, must be non-zero.
fn secs_or(raw: Option<String>, key: &str, default: Duration) -> Result<Duration> {
    let secs: u64 = parse_or(raw, key, default.as_secs())?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Duration::from_secs(secs))
}

/// Item count, must be non-zero.
fn count_or(raw: Option<String>, key: &str, default: usize) -> Result<usize> {
    let n: usize = parse_or(raw, key, default)?;
    anyhow::ensure!(n > 0, "{key} must be greater than zero");
    Ok(n)
}
