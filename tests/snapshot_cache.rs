//! Behavior tests for the snapshot cache: TTL, forced refresh and single-flight rebuilds.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use calfeed_core::{
    Aggregator, EconomicRecord, FeedBuilder, FeedConfig, FeedError, FeedPipeline, FeedRequest,
    HttpClient, HttpError, HttpRequest, HttpResponse, RawRecord, ScriptedHttpClient, SnapshotCache,
    SourceKind, StaticConstituents, StaticRecordSource,
};
use chrono::{DateTime, TimeZone, Utc};

const TTL: Duration = Duration::from_secs(600);

/// Slow builder that numbers every document it produces.
#[derive(Default)]
struct SlowBuilder {
    builds: AtomicUsize,
}

impl FeedBuilder for SlowBuilder {
    fn build<'a>(
        &'a self,
        _include_all: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, FeedError>> + Send + 'a>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let build = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("BEGIN:VCALENDAR\r\nX-BUILD:{build}\r\nEND:VCALENDAR\r\n"))
        })
    }
}

fn real_pipeline_cache() -> (SnapshotCache, Arc<StaticRecordSource>) {
    let economic = Arc::new(StaticRecordSource::new(
        SourceKind::Economic,
        vec![RawRecord::Economic(EconomicRecord {
            country: Some(String::from("US")),
            event: Some(String::from("CPI")),
            date: Some(String::from("2024-03-12")),
            ..EconomicRecord::default()
        })],
    ));
    let aggregator = Aggregator::new(
        economic.clone(),
        Arc::new(StaticRecordSource::new(SourceKind::Earnings, Vec::new())),
        Arc::new(StaticConstituents::new(Vec::new())),
    );
    let cache = SnapshotCache::new(Arc::new(FeedPipeline::new(aggregator, 30)), TTL);
    (cache, economic)
}

// =============================================================================
// Freshness
// =============================================================================

#[tokio::test]
async fn when_snapshot_is_fresh_repeated_gets_are_byte_identical() {
    // Given: a cache in front of the real pipeline
    let (cache, economic) = real_pipeline_cache();

    // When: the feed is requested twice within the TTL
    let first = cache.get(FeedRequest::default()).await;
    let second = cache.get(FeedRequest::default()).await;

    // Then: the same bytes come back and upstream was hit once
    assert_eq!(first.body, second.body);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(economic.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn when_ttl_elapses_exactly_one_rebuild_happens() {
    // Given: a warmed cache
    let cache = SnapshotCache::new(Arc::new(SlowBuilder::default()), TTL);
    let first = cache.get(FeedRequest::default()).await;

    // When: the clock moves past the TTL and the feed is requested twice
    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    let second = cache.get(FeedRequest::default()).await;
    let third = cache.get(FeedRequest::default()).await;

    // Then: one new document, reused by the later request
    assert!(first.body.contains("X-BUILD:1"));
    assert!(second.body.contains("X-BUILD:2"));
    assert_eq!(third.body, second.body);
    assert_eq!(cache.rebuild_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_ttl_has_not_elapsed_no_rebuild_happens() {
    let cache = SnapshotCache::new(Arc::new(SlowBuilder::default()), TTL);
    cache.get(FeedRequest::default()).await;

    tokio::time::advance(TTL - Duration::from_secs(1)).await;
    cache.get(FeedRequest::default()).await;

    assert_eq!(cache.rebuild_count(), 1);
}

// =============================================================================
// Forced refresh
// =============================================================================

#[tokio::test]
async fn when_refresh_is_forced_a_new_document_is_built() {
    let cache = SnapshotCache::new(Arc::new(SlowBuilder::default()), TTL);
    cache.get(FeedRequest::default()).await;

    let refreshed = cache
        .get(FeedRequest {
            force: true,
            include_all: false,
        })
        .await;

    assert!(refreshed.body.contains("X-BUILD:2"));
    assert_eq!(cache.rebuild_count(), 2);
    // and the forced result is what later readers see
    let after = cache.get(FeedRequest::default()).await;
    assert!(Arc::ptr_eq(&refreshed, &after));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn when_many_requests_miss_at_once_a_single_rebuild_serves_them_all() {
    // Given: an empty cache shared by many callers
    let cache = Arc::new(SnapshotCache::new(Arc::new(SlowBuilder::default()), TTL));

    // When: sixteen requests arrive together
    let handles = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(FeedRequest::default()).await })
        })
        .collect::<Vec<_>>();
    let mut bodies = Vec::new();
    for handle in handles {
        bodies.push(handle.await.expect("task completes").body.clone());
    }

    // Then: everyone got the one rebuilt document
    assert_eq!(cache.rebuild_count(), 1);
    assert!(bodies.iter().all(|body| body.contains("X-BUILD:1")));
}

#[tokio::test]
async fn when_forced_refreshes_race_each_waiter_reuses_the_rebuild_it_waited_on() {
    let cache = Arc::new(SnapshotCache::new(Arc::new(SlowBuilder::default()), TTL));

    let handles = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get(FeedRequest {
                        force: true,
                        include_all: false,
                    })
                    .await
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.await.expect("task completes");
    }

    assert_eq!(cache.rebuild_count(), 1);
}

// =============================================================================
// Unresponsive providers
// =============================================================================

/// Earnings requests run into their timeout; everything else is scripted.
struct TimingOutEarnings {
    scripted: ScriptedHttpClient,
}

impl HttpClient for TimingOutEarnings {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            if request.url.ends_with("/earnings-calendar") {
                tokio::time::sleep(Duration::from_millis(request.timeout_ms)).await;
                return Err(HttpError::Transport(String::from("request timeout")));
            }
            self.scripted.execute(request).await
        })
    }
}

fn march_first() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0)
        .single()
        .expect("unambiguous")
}

#[tokio::test(start_paused = true)]
async fn when_one_provider_times_out_on_every_retry_the_others_still_publish() {
    // Given: default settings, an earnings provider that never answers in
    // time and an economic provider with one CPI release
    let config = FeedConfig::default();
    let http = Arc::new(TimingOutEarnings {
        scripted: ScriptedHttpClient::new()
            .respond_json(
                "/economic-calendar",
                r#"[{"country":"US","event":"CPI","date":"2024-03-12 08:30:00"}]"#,
            )
            .respond_json("/economic-calendar", "[]"),
    });
    let pipeline =
        FeedPipeline::new(config.aggregator(http), config.lookahead_days).with_clock(march_first);
    let cache = SnapshotCache::new(Arc::new(pipeline), config.cache_ttl)
        .with_rebuild_timeout(config.rebuild_deadline());
    let started = tokio::time::Instant::now();

    // When: the feed is built
    let snapshot = cache.get(FeedRequest::default()).await;

    // Then: the rebuild finished inside its deadline and kept the CPI event
    assert!(started.elapsed() < config.rebuild_deadline());
    assert!(!snapshot.degraded);
    assert!(snapshot.body.contains("SUMMARY:CPI (Economic)"), "body={}", snapshot.body);
}

#[tokio::test(start_paused = true)]
async fn when_a_provider_never_answers_its_fetch_is_abandoned_at_the_source_deadline() {
    let config = FeedConfig::default();
    let economic = ScriptedHttpClient::new().respond_json(
        "/economic-calendar",
        r#"[{"country":"US","event":"CPI","date":"2024-03-12 08:30:00"}]"#,
    );
    let pipeline = FeedPipeline::new(
        config.aggregator(Arc::new(NeverAnsweringEarnings { scripted: economic })),
        config.lookahead_days,
    )
    .with_clock(march_first);

    let run = pipeline.run(false).await.expect("pipeline runs");

    assert!(run.report.earnings.status.is_failed());
    assert_eq!(
        run.report.earnings.status.reason(),
        Some(format!("no answer within {}s", config.fetch_deadline().for_days(366).as_secs()).as_str())
    );
    assert!(!run.placeholders);
    assert!(run.events.iter().any(|event| event.summary == "CPI (Economic)"));
}

/// Earnings requests hang with no timeout of their own.
struct NeverAnsweringEarnings {
    scripted: ScriptedHttpClient,
}

impl HttpClient for NeverAnsweringEarnings {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            if request.url.ends_with("/earnings-calendar") {
                std::future::pending::<()>().await;
            }
            self.scripted.execute(request).await
        })
    }
}
