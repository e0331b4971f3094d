//! HTTP handlers.
//!
//! # Endpoints
//!
//! - `GET /us_financial_calendar.ics` - the feed (`refresh=1` rebuilds, `all=1` widens earnings)
//! - `GET /health` - liveness and cache TTL
//! - `GET /debug` - upstream probe report
//! - `GET /` - index page

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use calfeed_core::{diagnostics, FeedRequest};
use serde::Serialize;
use serde_json::json;

use super::state::AppState;

pub const FEED_PATH: &str = "/us_financial_calendar.ics";
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Query pairs as sent; repeated keys are allowed.
type FeedParams = Vec<(String, String)>;

/// A flag is on when any occurrence of `name` equals `1`.
fn flag(params: &[(String, String)], name: &str) -> bool {
    params
        .iter()
        .any(|(key, value)| key == name && value.trim() == "1")
}

/// Always 200 with a calendar body; rebuild failures degrade to an empty calendar.
pub async fn feed(
    State(state): State<AppState>,
    params: Result<Query<FeedParams>, QueryRejection>,
) -> Response {
    let params = params.map(|Query(params)| params).unwrap_or_else(|rejection| {
        tracing::debug!(%rejection, "ignoring unreadable feed query");
        Vec::new()
    });
    let request = FeedRequest {
        force: flag(&params, "refresh"),
        include_all: flag(&params, "all"),
    };
    let snapshot = state.cache.get(request).await;

    (
        [(header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE)],
        snapshot.body.clone(),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub feed_path: &'static str,
    pub cached_seconds: u64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        feed_path: FEED_PATH,
        cached_seconds: state.cache.ttl().as_secs(),
    })
}

pub async fn debug(State(state): State<AppState>) -> Response {
    let window = state.current_window();
    let include_all = state.config.include_all_earnings;
    let client = state.client.clone();
    let seed = state.seed.clone();

    let task = tokio::spawn(async move {
        diagnostics::probe(&client, window, include_all, &seed).await
    });

    match task.await {
        Ok(report) => Json(report).into_response(),
        Err(error) => {
            tracing::error!(%error, "debug probe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "error": error.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn index() -> Html<String> {
    Html(format!(
        "<h3>US Economic &amp; Earnings Calendar is running.</h3>\
         <p>Subscribe to the ICS feed: <a href=\"{FEED_PATH}\">{FEED_PATH}</a></p>\
         <p>Health: <a href=\"/health\">/health</a> | Debug: <a href=\"/debug\">/debug</a></p>\
         <p>Force refresh: <a href=\"{FEED_PATH}?refresh=1\">{FEED_PATH}?refresh=1</a></p>\
         <p>Include all earnings: append <code>&amp;all=1</code> to the feed URL.</p>"
    ))
}
