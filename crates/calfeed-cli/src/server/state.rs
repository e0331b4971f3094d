use std::collections::BTreeSet;
use std::sync::Arc;

use calfeed_core::{
    clock, DateWindow, FeedConfig, FeedPipeline, FmpClient, HttpClient, SnapshotCache, Symbol,
};
use chrono::Utc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SnapshotCache>,
    pub client: FmpClient,
    pub config: Arc<FeedConfig>,
    pub seed: Arc<BTreeSet<Symbol>>,
}

impl AppState {
    pub fn new(cache: Arc<SnapshotCache>, client: FmpClient, config: FeedConfig) -> Self {
        Self {
            cache,
            client,
            config: Arc::new(config),
            seed: Arc::new(Symbol::dow_30()),
        }
    }

    /// Wires the Financial Modeling Prep adapters, pipeline and cache from `config`.
    pub fn from_config(config: FeedConfig, http: Arc<dyn HttpClient>) -> Self {
        let client = config.fmp_client(Arc::clone(&http));
        let pipeline = FeedPipeline::new(config.aggregator(http), config.lookahead_days);
        let cache = SnapshotCache::new(Arc::new(pipeline), config.cache_ttl)
            .with_rebuild_timeout(config.rebuild_deadline())
            .with_include_all_configured(config.include_all_earnings);

        Self::new(Arc::new(cache), client, config)
    }

    /// The window a rebuild started now would cover.
    pub fn current_window(&self) -> DateWindow {
        DateWindow::lookahead(
            clock::today_in_reference_zone(Utc::now()),
            self.config.lookahead_days,
        )
    }
}
