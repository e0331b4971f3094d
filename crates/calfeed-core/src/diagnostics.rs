//! Upstream reachability probe behind `/debug` and `calfeed probe`.
//!
//! Sends one unchunked request per endpoint for the whole window and reports
//! the raw HTTP status and list size, bypassing normalization entirely.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::adapters::FmpClient;
use crate::domain::{DateWindow, Symbol};

/// `from`/`to` pair as sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowParams {
    pub from: String,
    pub to: String,
}

impl From<DateWindow> for WindowParams {
    fn from(window: DateWindow) -> Self {
        Self {
            from: window.from_param(),
            to: window.to_param(),
        }
    }
}

/// Result of one probed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointProbe {
    /// `None` when no response arrived at all.
    pub status: Option<u16>,
    /// List length, `1` for a non-list body, `-1` for an unparsable one.
    pub size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugReport {
    pub status: &'static str,
    pub window: WindowParams,
    pub sp500_status: Option<u16>,
    pub sp500_size: Option<i64>,
    pub earnings_status: Option<u16>,
    pub earnings_size: Option<i64>,
    pub economics_status: Option<u16>,
    pub economics_size: Option<i64>,
    pub include_all_earnings: bool,
    /// Live constituents plus the seed list; `None` when every symbol is included.
    pub universe_size: Option<usize>,
    pub using_key_prefix: Option<String>,
}

/// Probes the three endpoints concurrently.
pub async fn probe(
    client: &FmpClient,
    window: DateWindow,
    include_all_earnings: bool,
    seed: &BTreeSet<Symbol>,
) -> DebugReport {
    let params = [("from", window.from_param()), ("to", window.to_param())];
    let sp500_url = client.legacy_url("sp500_constituent");
    let earnings_url = client.stable_url("earnings-calendar");
    let economics_url = client.stable_url("economic-calendar");

    let (sp500, earnings, economics) = tokio::join!(
        probe_endpoint(client, &sp500_url, &[]),
        probe_endpoint(client, &earnings_url, &params),
        probe_endpoint(client, &economics_url, &params),
    );

    let universe_size = (!include_all_earnings).then(|| {
        let mut universe = seed.clone();
        universe.extend(sp500.1);
        universe.len()
    });
    let key_prefix = client.key_prefix();

    DebugReport {
        status: "ok",
        window: WindowParams::from(window),
        sp500_status: sp500.0.status,
        sp500_size: sp500.0.size,
        earnings_status: earnings.0.status,
        earnings_size: earnings.0.size,
        economics_status: economics.0.status,
        economics_size: economics.0.size,
        include_all_earnings,
        universe_size,
        using_key_prefix: (!key_prefix.is_empty()).then(|| format!("{key_prefix}***")),
    }
}

/// Probe result plus any symbols found in the body.
async fn probe_endpoint(
    client: &FmpClient,
    url: &str,
    params: &[(&str, String)],
) -> (EndpointProbe, Vec<Symbol>) {
    let response = match client.get(url, params).await {
        Ok(response) => response,
        Err(exhausted) => {
            tracing::debug!(url, reason = %exhausted, "probe got no usable response");
            return (
                EndpointProbe {
                    status: exhausted.last_status,
                    size: None,
                },
                Vec::new(),
            );
        }
    };

    let (size, symbols) = match serde_json::from_str::<Value>(&response.body) {
        Ok(Value::Array(items)) => {
            let symbols = items
                .iter()
                .filter_map(|row| row.get("symbol").and_then(Value::as_str))
                .filter_map(|raw| Symbol::parse(raw).ok())
                .collect();
            (items.len() as i64, symbols)
        }
        Ok(_) => (1, Vec::new()),
        Err(_) => (-1, Vec::new()),
    };

    (
        EndpointProbe {
            status: Some(response.status),
            size: Some(size),
        },
        symbols,
    )
}
