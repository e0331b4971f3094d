//! Environment-driven settings.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `FMP_API_KEY` | `demo` | Financial Modeling Prep key |
//! | `LOOKAHEAD_DAYS` | `365` | Days past today covered by the feed |
//! | `CACHE_TTL` | `600` | Snapshot lifetime in seconds |
//! | `INCLUDE_ALL_EARNINGS` | off | Skip the symbol universe filter |
//! | `AUTO_WIDEN_UNIVERSE` | off | Include all earnings when the constituent list is unusable |
//! | `HTTP_TIMEOUT_MS` | `25000` | Per-request upstream timeout |
//! | `FETCH_CHUNK_DAYS` | `60` | Sub-window size for dated endpoints |
//! | `RETRY_JITTER` | off | Spread retry backoff by up to 25% |
//! | `REBUILD_TIMEOUT_SECS` | derived | Deadline for one feed rebuild |
//! | `HOST` / `PORT` | `0.0.0.0` / `5000` | Listen address |
//!
//! Without `REBUILD_TIMEOUT_SECS` the rebuild deadline is the slowest source's
//! worst case (every chunk request exhausting its retries) plus
//! [`REBUILD_GRACE_SECS`]. Sources that overrun are failed individually
//! before the rebuild deadline is reached.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{FmpClient, DEFAULT_CHUNK_DAYS, DEFAULT_TIMEOUT_MS};
use crate::aggregator::Aggregator;
use crate::error::ConfigError;
use crate::http_client::HttpClient;
use crate::retry::RetryPolicy;
use crate::source::FetchDeadline;

pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 365;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const REBUILD_GRACE_SECS: u64 = 30;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub api_key: String,
    pub lookahead_days: u32,
    pub cache_ttl: Duration,
    pub include_all_earnings: bool,
    pub auto_widen_universe: bool,
    pub http_timeout_ms: u64,
    pub fetch_chunk_days: u32,
    pub retry_jitter: bool,
    /// Explicit rebuild deadline; derived from the fetch budget when `None`.
    pub rebuild_timeout: Option<Duration>,
    pub host: String,
    pub port: u16,
}

impl std::fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedConfig")
            .field("api_key", &self.key_prefix())
            .field("lookahead_days", &self.lookahead_days)
            .field("cache_ttl", &self.cache_ttl)
            .field("include_all_earnings", &self.include_all_earnings)
            .field("auto_widen_universe", &self.auto_widen_universe)
            .field("http_timeout_ms", &self.http_timeout_ms)
            .field("fetch_chunk_days", &self.fetch_chunk_days)
            .field("retry_jitter", &self.retry_jitter)
            .field("rebuild_timeout", &self.rebuild_deadline())
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_key: String::from("demo"),
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            include_all_earnings: false,
            auto_widen_universe: false,
            http_timeout_ms: DEFAULT_TIMEOUT_MS,
            fetch_chunk_days: DEFAULT_CHUNK_DAYS,
            retry_jitter: false,
            rebuild_timeout: None,
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
        }
    }
}

impl FeedConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`; unset or blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Ok(Self {
            api_key: get("FMP_API_KEY").unwrap_or(defaults.api_key),
            lookahead_days: parse_number(&get, "LOOKAHEAD_DAYS", defaults.lookahead_days)?,
            cache_ttl: Duration::from_secs(parse_number(
                &get,
                "CACHE_TTL",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            include_all_earnings: get("INCLUDE_ALL_EARNINGS").is_some_and(|value| is_enabled(&value)),
            auto_widen_universe: get("AUTO_WIDEN_UNIVERSE").is_some_and(|value| is_enabled(&value)),
            http_timeout_ms: parse_number(&get, "HTTP_TIMEOUT_MS", defaults.http_timeout_ms)?,
            fetch_chunk_days: positive(
                "FETCH_CHUNK_DAYS",
                parse_number(&get, "FETCH_CHUNK_DAYS", defaults.fetch_chunk_days)?,
            )?,
            retry_jitter: get("RETRY_JITTER").is_some_and(|value| is_enabled(&value)),
            rebuild_timeout: match get("REBUILD_TIMEOUT_SECS") {
                None => None,
                Some(_) => Some(Duration::from_secs(positive(
                    "REBUILD_TIMEOUT_SECS",
                    parse_number(&get, "REBUILD_TIMEOUT_SECS", 0_u64)?,
                )?)),
            },
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_number(&get, "PORT", defaults.port)?,
        })
    }

    /// First four characters of the API key followed by `***`.
    pub fn key_prefix(&self) -> String {
        let prefix = self.api_key.chars().take(4).collect::<String>();
        format!("{prefix}***")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_jitter(self.retry_jitter)
    }

    /// Per-source deadline the aggregator applies.
    pub fn fetch_deadline(&self) -> FetchDeadline {
        FetchDeadline {
            per_request: self
                .retry_policy()
                .budget(Duration::from_millis(self.http_timeout_ms)),
            chunk_days: self.fetch_chunk_days,
        }
    }

    /// Explicit `REBUILD_TIMEOUT_SECS`, or the lookahead window's fetch
    /// deadline plus [`REBUILD_GRACE_SECS`].
    pub fn rebuild_deadline(&self) -> Duration {
        self.rebuild_timeout.unwrap_or_else(|| {
            self.fetch_deadline()
                .for_days(u64::from(self.lookahead_days) + 1)
                .saturating_add(Duration::from_secs(REBUILD_GRACE_SECS))
        })
    }

    pub fn fmp_client(&self, http: Arc<dyn HttpClient>) -> FmpClient {
        FmpClient::new(http, self.api_key.clone())
            .with_timeout_ms(self.http_timeout_ms)
            .with_chunk_days(self.fetch_chunk_days)
            .with_retry(self.retry_policy())
    }

    pub fn aggregator(&self, http: Arc<dyn HttpClient>) -> Aggregator {
        Aggregator::fmp(self.fmp_client(http))
            .with_include_all(self.include_all_earnings)
            .with_auto_widen(self.auto_widen_universe)
    }
}

fn is_enabled(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_number<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&'static str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            expected: "a non-negative integer",
            value,
        }),
    }
}

fn positive<T>(name: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialEq + Default + ToString,
{
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            name,
            expected: "greater than zero",
            value: value.to_string(),
        });
    }
    Ok(value)
}
