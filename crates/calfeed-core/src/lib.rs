//! # calfeed core
//!
//! Builds a single iCalendar feed of upcoming US economic releases and
//! earnings reports from Financial Modeling Prep data.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Financial Modeling Prep adapters (economic, earnings, constituents) |
//! | [`aggregator`] | Concurrent fetch, universe filter and normalization per window |
//! | [`cache`] | TTL snapshot cache with single-flight rebuilds |
//! | [`calendar`] | RFC 5545 writer |
//! | [`clock`] | Provider date/time parsing into `America/New_York` |
//! | [`config`] | Environment-driven settings |
//! | [`diagnostics`] | Upstream probe behind `/debug` |
//! | [`domain`] | Events, raw records, symbols, date windows |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalizer`] | Raw records to events |
//! | [`pipeline`] | Collect, substitute placeholders, render |
//! | [`retry`] | Bounded retry with linear backoff |
//! | [`source`] | Adapter contract and fetch outcomes |
//! | [`universe`] | Earnings symbol universe policy |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ SnapshotCache   │── fresh? ──▶ cached document
//! └────────┬────────┘
//!          │ rebuild
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ FeedPipeline    │────▶│ Calendar writer  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Aggregator      │────▶│ Universe +       │
//! │                 │     │ Normalizer       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Source adapters │────▶│ RetryPolicy +    │
//! │ (chunked)       │     │ HttpClient       │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use calfeed_core::{FeedConfig, FeedPipeline, FeedRequest, ReqwestHttpClient, SnapshotCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FeedConfig::from_env()?;
//!     let aggregator = config.aggregator(Arc::new(ReqwestHttpClient::new()));
//!     let pipeline = FeedPipeline::new(aggregator, config.lookahead_days);
//!     let cache = SnapshotCache::new(Arc::new(pipeline), config.cache_ttl);
//!
//!     let snapshot = cache.get(FeedRequest::default()).await;
//!     println!("{}", snapshot.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Model
//!
//! Nothing upstream can turn the feed into an error. Transport failures are
//! retried and then recorded as failed windows, bad records are dropped one
//! at a time, an empty result is replaced by placeholder events, and a
//! panicking or stalled rebuild yields a minimal empty calendar.

pub mod adapters;
pub mod aggregator;
pub mod cache;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod normalizer;
pub mod pipeline;
pub mod retry;
pub mod source;
pub mod universe;

// Adapters
pub use adapters::{ConstituentAdapter, EarningsCalendarAdapter, EconomicCalendarAdapter, FmpClient};

// Aggregation
pub use aggregator::{Aggregator, Collection, CollectionReport, SourceReport};

// Caching
pub use cache::{FeedBuilder, FeedRequest, FeedVariant, Snapshot, SnapshotCache};

// Configuration
pub use config::FeedConfig;

// Diagnostics
pub use diagnostics::{DebugReport, WindowParams};

// Domain models
pub use domain::{
    DateWindow, EarningsRecord, EconomicRecord, Event, EventKind, IdentitySeed, RawRecord, Symbol,
    DOW_30,
};

// Error types
pub use error::{ConfigError, FeedError, ValidationError};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, ScriptedHttpClient};

// Normalization
pub use normalizer::{DropCounts, DropReason, Session};

// Pipeline
pub use pipeline::{FeedPipeline, FeedRun};

// Retry logic
pub use retry::{Backoff, RetryExhausted, RetryPolicy};

// Source contract
pub use source::{
    ConstituentSource, FetchDeadline, FetchStatus, Fetched, RecordSource, SourceKind, StaticConstituents,
    StaticRecordSource,
};

// Universe
pub use universe::{Universe, UniverseMode};
