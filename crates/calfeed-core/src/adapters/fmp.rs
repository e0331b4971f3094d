use std::sync::Arc;

use serde_json::Value;

use crate::domain::{DateWindow, RawRecord};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::retry::{RetryExhausted, RetryPolicy};
use crate::source::{FetchDeadline, FetchStatus, Fetched, SourceKind};

pub const STABLE_BASE_URL: &str = "https://financialmodelingprep.com/stable";
pub const LEGACY_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

pub const DEFAULT_CHUNK_DAYS: u32 = 60;
pub const DEFAULT_TIMEOUT_MS: u64 = 25_000;

/// Financial Modeling Prep connection settings shared by every adapter.
#[derive(Clone)]
pub struct FmpClient {
    http: Arc<dyn HttpClient>,
    api_key: String,
    stable_base: String,
    legacy_base: String,
    timeout_ms: u64,
    chunk_days: u32,
    retry: RetryPolicy,
}

impl std::fmt::Debug for FmpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FmpClient")
            .field("api_key", &self.key_prefix())
            .field("stable_base", &self.stable_base)
            .field("legacy_base", &self.legacy_base)
            .field("timeout_ms", &self.timeout_ms)
            .field("chunk_days", &self.chunk_days)
            .field("retry", &self.retry)
            .finish()
    }
}

impl FmpClient {
    pub fn new(http: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            stable_base: String::from(STABLE_BASE_URL),
            legacy_base: String::from(LEGACY_BASE_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            chunk_days: DEFAULT_CHUNK_DAYS,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_urls(
        mut self,
        stable_base: impl Into<String>,
        legacy_base: impl Into<String>,
    ) -> Self {
        self.stable_base = stable_base.into();
        self.legacy_base = legacy_base.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Values below one day are raised to one.
    pub fn with_chunk_days(mut self, chunk_days: u32) -> Self {
        self.chunk_days = chunk_days.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn chunk_days(&self) -> u32 {
        self.chunk_days
    }

    /// Time one request may take with every retry timing out.
    pub fn fetch_deadline(&self) -> FetchDeadline {
        FetchDeadline {
            per_request: self
                .retry
                .budget(std::time::Duration::from_millis(self.timeout_ms)),
            chunk_days: self.chunk_days,
        }
    }

    /// First four characters of the key, for diagnostics only.
    pub fn key_prefix(&self) -> String {
        self.api_key.chars().take(4).collect()
    }

    pub(crate) fn stable_url(&self, path: &str) -> String {
        format!("{}/{path}", self.stable_base.trim_end_matches('/'))
    }

    pub(crate) fn legacy_url(&self, path: &str) -> String {
        format!("{}/{path}", self.legacy_base.trim_end_matches('/'))
    }

    /// One authenticated GET, retried per policy.
    pub(crate) async fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<HttpResponse, RetryExhausted> {
        let mut request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);
        for (name, value) in params {
            request = request.with_query(*name, value.clone());
        }
        let request = request.with_query("apikey", self.api_key.clone());

        self.retry.execute(self.http.as_ref(), &request).await
    }

    /// [`get`](Self::get), decoded as a JSON list.
    pub(crate) async fn get_list(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Value>, String> {
        let response = self
            .get(url, params)
            .await
            .map_err(|exhausted| exhausted.to_string())?;

        match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(other) => Err(format!("expected a JSON list, got {}", json_kind(&other))),
            Err(e) => Err(format!("invalid JSON body: {e}")),
        }
    }

    /// Fetches `window` in sequential sub-windows and concatenates the records
    /// in sub-window order.
    pub(crate) async fn fetch_windowed(
        &self,
        source: SourceKind,
        path: &str,
        window: DateWindow,
        decode: fn(Value) -> Option<RawRecord>,
    ) -> Fetched<RawRecord> {
        let chunks = match window.chunks(self.chunk_days) {
            Ok(chunks) => chunks,
            Err(e) => return Fetched::failed(source, e.to_string()),
        };
        let url = self.stable_url(path);

        let mut records = Vec::new();
        let mut failed_windows = Vec::new();
        let mut last_reason = String::new();
        let mut skipped = 0usize;

        for chunk in &chunks {
            let params = [("from", chunk.from_param()), ("to", chunk.to_param())];
            match self.get_list(&url, &params).await {
                Ok(items) => {
                    for item in items {
                        match decode(item) {
                            Some(record) => records.push(record),
                            None => skipped += 1,
                        }
                    }
                }
                Err(reason) => {
                    tracing::warn!(%source, window = %chunk, %reason, "provider window failed");
                    failed_windows.push(chunk.to_string());
                    last_reason = reason;
                }
            }
        }

        if skipped > 0 {
            tracing::debug!(%source, skipped, "skipped non-object list entries");
        }

        let status = if failed_windows.len() == chunks.len() {
            FetchStatus::Failed {
                reason: last_reason,
            }
        } else if !failed_windows.is_empty() {
            FetchStatus::Partial {
                failed_windows,
                reason: last_reason,
            }
        } else if records.is_empty() {
            FetchStatus::Empty
        } else {
            FetchStatus::Ok
        };

        Fetched {
            source,
            records,
            status,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
