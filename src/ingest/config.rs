// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Feeds used when no feed file is present.
pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig {
            name: "google-news-india-economy".into(),
            url: "https://news.google.com/rss/search?q=india+economy&hl=en-IN&gl=IN&ceid=IN:en"
                .into(),
        },
        FeedConfig {
            name: "google-news-oil-price".into(),
            url: "https://news.google.com/rss/search?q=oil+price&hl=en-US&gl=US&ceid=US:en".into(),
        },
    ]
}

/// Load feeds from an explicit path. Supports TOML or JSON formats.
pub fn load_feeds_from(path: &Path) -> Result<Vec<FeedConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feeds from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str())
}

/// Resolve feeds:
/// 1) explicit path (must exist)
/// 2) config/feeds.toml
/// 3) config/feeds.json
/// 4) built-in defaults
pub fn load_feeds(explicit: Option<&Path>) -> Result<Vec<FeedConfig>> {
    if let Some(p) = explicit {
        if p.exists() {
            return load_feeds_from(p);
        }
        return Err(anyhow!("FEEDS_PATH points to non-existent path {}", p.display()));
    }
    let toml_p = PathBuf::from("config/feeds.toml");
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feeds.json");
    if json_p.exists() {
        return load_feeds_from(&json_p);
    }
    Ok(default_feeds())
}

fn parse_feeds(s: &str, hint_ext: &str) -> Result<Vec<FeedConfig>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[[feeds]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feeds format"))
}

fn parse_toml(s: &str) -> Result<Vec<FeedConfig>> {
    #[derive(Deserialize)]
    struct TomlFeeds {
        feeds: Vec<FeedConfig>,
    }
    let v: TomlFeeds = toml::from_str(s)?;
    Ok(clean_list(v.feeds))
}

fn parse_json(s: &str) -> Result<Vec<FeedConfig>> {
    let v: Vec<FeedConfig> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop entries without a URL, keep the first entry per URL.
fn clean_list(items: Vec<FeedConfig>) -> Vec<FeedConfig> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let url = it.url.trim().to_string();
        if url.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        let name = match it.name.trim() {
            "" => url.clone(),
            n => n.to_string(),
        };
        out.push(FeedConfig { name, url });
    }
    out
}
