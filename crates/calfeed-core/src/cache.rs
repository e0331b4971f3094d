//! Snapshot cache for the rendered calendar document.
//!
//! One snapshot per [`FeedVariant`], replaced whole on every rebuild and
//! handed out as `Arc<Snapshot>`. Rebuilds run one at a time; requests that
//! queue behind a rebuild reuse its result instead of starting another.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::calendar;
use crate::error::FeedError;

/// Produces a complete calendar document.
pub trait FeedBuilder: Send + Sync {
    fn build<'a>(
        &'a self,
        include_all: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, FeedError>> + Send + 'a>>;
}

/// Which earnings universe a snapshot was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedVariant {
    Configured,
    AllEarnings,
}

impl FeedVariant {
    pub const fn include_all(self) -> bool {
        matches!(self, Self::AllEarnings)
    }
}

/// Per-call cache options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedRequest {
    /// Rebuild even when the stored snapshot is fresh.
    pub force: bool,
    /// Ask for the include-all earnings variant.
    pub include_all: bool,
}

/// Immutable rendered document plus when it was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub body: String,
    pub variant: FeedVariant,
    pub built_at: Instant,
    pub generated_at: DateTime<Utc>,
    /// Rebuild failed and `body` is the empty fallback document.
    pub degraded: bool,
}

impl Snapshot {
    pub fn age(&self) -> Duration {
        self.built_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// TTL cache in front of a [`FeedBuilder`].
pub struct SnapshotCache {
    builder: Arc<dyn FeedBuilder>,
    ttl: Duration,
    rebuild_timeout: Duration,
    include_all_configured: bool,
    slots: RwLock<HashMap<FeedVariant, Arc<Snapshot>>>,
    rebuild_lock: Mutex<()>,
    rebuilds: AtomicU64,
}

impl SnapshotCache {
    pub fn new(builder: Arc<dyn FeedBuilder>, ttl: Duration) -> Self {
        Self {
            builder,
            ttl,
            rebuild_timeout: crate::config::FeedConfig::default().rebuild_deadline(),
            include_all_configured: false,
            slots: RwLock::new(HashMap::new()),
            rebuild_lock: Mutex::new(()),
            rebuilds: AtomicU64::new(0),
        }
    }

    pub fn with_rebuild_timeout(mut self, rebuild_timeout: Duration) -> Self {
        self.rebuild_timeout = rebuild_timeout;
        self
    }

    /// When the configured universe already includes everything, the
    /// include-all request shares its snapshot.
    pub fn with_include_all_configured(mut self, include_all: bool) -> Self {
        self.include_all_configured = include_all;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Completed rebuilds since construction, failed ones included.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::SeqCst)
    }

    pub fn variant_for(&self, include_all: bool) -> FeedVariant {
        if include_all && !self.include_all_configured {
            FeedVariant::AllEarnings
        } else {
            FeedVariant::Configured
        }
    }

    /// Returns the stored snapshot when fresh, otherwise rebuilds it.
    pub async fn get(&self, request: FeedRequest) -> Arc<Snapshot> {
        let variant = self.variant_for(request.include_all);
        let requested_at = Instant::now();

        if !request.force {
            if let Some(snapshot) = self.fresh(variant).await {
                return snapshot;
            }
        }

        let _guard = self.rebuild_lock.lock().await;

        // Someone else may have rebuilt while this request waited.
        if let Some(snapshot) = self.stored(variant).await {
            let rebuilt_meanwhile = snapshot.built_at >= requested_at;
            if rebuilt_meanwhile || (!request.force && snapshot.is_fresh(self.ttl)) {
                return snapshot;
            }
        }

        let snapshot = Arc::new(self.rebuild(variant).await);
        self.slots.write().await.insert(variant, Arc::clone(&snapshot));
        snapshot
    }

    /// Builds the configured variant ahead of the first request.
    pub async fn warm(&self) -> Arc<Snapshot> {
        self.get(FeedRequest {
            force: true,
            include_all: false,
        })
        .await
    }

    /// Drops every stored snapshot.
    pub async fn invalidate(&self) {
        self.slots.write().await.clear();
    }

    pub async fn stored(&self, variant: FeedVariant) -> Option<Arc<Snapshot>> {
        self.slots.read().await.get(&variant).cloned()
    }

    async fn fresh(&self, variant: FeedVariant) -> Option<Arc<Snapshot>> {
        self.stored(variant)
            .await
            .filter(|snapshot| snapshot.is_fresh(self.ttl))
    }

    async fn rebuild(&self, variant: FeedVariant) -> Snapshot {
        let started = Instant::now();
        let builder = Arc::clone(&self.builder);
        let include_all = variant.include_all();
        let task = tokio::spawn(async move { builder.build(include_all).await });
        let abort = task.abort_handle();

        let outcome = match tokio::time::timeout(self.rebuild_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(FeedError::Panicked(join_error.to_string())),
            Err(_) => {
                abort.abort();
                Err(FeedError::TimedOut {
                    seconds: self.rebuild_timeout.as_secs(),
                })
            }
        };
        self.rebuilds.fetch_add(1, Ordering::SeqCst);

        let (body, degraded) = match outcome {
            Ok(body) => {
                tracing::info!(
                    ?variant,
                    bytes = body.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "feed snapshot rebuilt"
                );
                (body, false)
            }
            Err(error) => {
                tracing::error!(?variant, %error, "feed rebuild failed; serving empty calendar");
                (calendar::empty_document(), true)
            }
        };

        Snapshot {
            body,
            variant,
            built_at: Instant::now(),
            generated_at: Utc::now(),
            degraded,
        }
    }
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("ttl", &self.ttl)
            .field("rebuild_timeout", &self.rebuild_timeout)
            .field("include_all_configured", &self.include_all_configured)
            .field("rebuilds", &self.rebuild_count())
            .finish_non_exhaustive()
    }
}
