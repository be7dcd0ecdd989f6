//! Summarizer: hosted inference client with a deterministic truncation fallback.
//!
//! `summarize` never fails. Without an API key it returns the first 300 chars
//! of the input tagged `model = "none"` and performs no network call. Any
//! transport, status or payload problem yields the same truncation tagged
//! `model = "error"`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{truncate_chars, MAX_SUMMARY_INPUT_CHARS};

pub const FALLBACK_CHARS: usize = 300;
pub const MODEL_NONE: &str = "none";
pub const MODEL_ERROR: &str = "error";

pub const DEFAULT_HF_MODEL: &str = "sshleifer/distilbart-cnn-12-6";
pub const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryResult {
    pub summary: String,
    pub model: String,
}

impl SummaryResult {
    /// First 300 chars of `text`, tagged with `model`.
    pub fn truncated(text: &str, model: &str) -> Self {
        Self {
            summary: truncate_chars(text, FALLBACK_CHARS),
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> SummaryResult;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Hugging Face `/models/<model>` client.
pub struct HfSummarizer {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    max_input_chars: usize,
}

impl HfSummarizer {
    pub fn new(
        api_key: Option<String>,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("market-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()
            .context("building summarizer http client")?;
        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), model),
            max_input_chars: MAX_SUMMARY_INPUT_CHARS,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call(&self, api_key: &str, text: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Req<'a> {
            inputs: &'a str,
        }

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&Req { inputs: text })
            .send()
            .await
            .context("summarizer request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "summarizer status {status}: {}",
                truncate_chars(&body, 200)
            ));
        }

        let body: Value = resp.json().await.context("summarizer payload")?;
        let out = extract_summary_text(&body).unwrap_or_default();
        let out = out.trim();
        if out.is_empty() {
            return Err(anyhow!("summarizer returned empty summary"));
        }
        Ok(out.to_string())
    }
}

#[async_trait::async_trait]
impl Summarizer for HfSummarizer {
    async fn summarize(&self, text: &str) -> SummaryResult {
        let input = truncate_chars(text, self.max_input_chars);

        let Some(key) = self.api_key.as_deref() else {
            counter!("summarizer_fallback_total", "reason" => "disabled").increment(1);
            return SummaryResult::truncated(&input, MODEL_NONE);
        };

        match self.call(key, &input).await {
            Ok(summary) => SummaryResult {
                summary,
                model: self.model.clone(),
            },
            Err(e) => {
                tracing::warn!(target: "summarize", error = ?e, model = %self.model, "summarizer failed, using truncation");
                counter!("summarizer_fallback_total", "reason" => "error").increment(1);
                SummaryResult::truncated(&input, MODEL_ERROR)
            }
        }
    }
}

/// Accepts `[{"summary_text": ..}]`, `{"summary_text": ..}` or a bare string.
pub fn extract_summary_text(v: &Value) -> Option<String> {
    match v {
        Value::Array(items) => items
            .first()
            .and_then(|first| first.get("summary_text"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::Object(_) => v
            .get("summary_text")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
