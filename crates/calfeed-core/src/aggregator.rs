//! Concurrent fetch, universe decision and normalization for one window.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::adapters::{ConstituentAdapter, EarningsCalendarAdapter, EconomicCalendarAdapter, FmpClient};
use crate::domain::{DateWindow, Event, Symbol};
use crate::normalizer::{self, DropCounts};
use crate::source::{ConstituentSource, FetchDeadline, FetchStatus, Fetched, RecordSource, SourceKind};
use crate::universe::{Universe, UniverseMode, UniversePolicy};

/// Outcome of one source fetch, as shown in logs and `/debug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub status: FetchStatus,
    pub records: usize,
}

impl<T> From<&Fetched<T>> for SourceReport {
    fn from(fetched: &Fetched<T>) -> Self {
        Self {
            status: fetched.status.clone(),
            records: fetched.len(),
        }
    }
}

/// What happened during a [`Aggregator::collect`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub window: DateWindow,
    pub economic: SourceReport,
    pub earnings: SourceReport,
    pub constituents: SourceReport,
    pub universe_mode: UniverseMode,
    pub universe_size: Option<usize>,
    pub economic_events: usize,
    pub earnings_events: usize,
    pub dropped: DropCounts,
}

/// Sorted events plus the run report.
#[derive(Debug, Clone)]
pub struct Collection {
    pub events: Vec<Event>,
    pub report: CollectionReport,
}

/// Pulls every source for a window and produces the ordered event list.
#[derive(Clone)]
pub struct Aggregator {
    economic: Arc<dyn RecordSource>,
    earnings: Arc<dyn RecordSource>,
    constituents: Arc<dyn ConstituentSource>,
    seed: BTreeSet<Symbol>,
    include_all: bool,
    auto_widen: bool,
    deadline: Option<FetchDeadline>,
}

impl Aggregator {
    pub fn new(
        economic: Arc<dyn RecordSource>,
        earnings: Arc<dyn RecordSource>,
        constituents: Arc<dyn ConstituentSource>,
    ) -> Self {
        Self {
            economic,
            earnings,
            constituents,
            seed: Symbol::dow_30(),
            include_all: false,
            auto_widen: false,
            deadline: None,
        }
    }

    /// All three sources backed by Financial Modeling Prep, each bounded by
    /// the client's retry budget.
    pub fn fmp(client: FmpClient) -> Self {
        let deadline = client.fetch_deadline();
        Self::new(
            Arc::new(EconomicCalendarAdapter::new(client.clone())),
            Arc::new(EarningsCalendarAdapter::new(client.clone())),
            Arc::new(ConstituentAdapter::new(client)),
        )
        .with_deadline(deadline)
    }

    /// A source still running past its deadline is reported as failed and
    /// the others are kept.
    pub fn with_deadline(mut self, deadline: FetchDeadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_seed(mut self, seed: BTreeSet<Symbol>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_include_all(mut self, include_all: bool) -> Self {
        self.include_all = include_all;
        self
    }

    pub fn with_auto_widen(mut self, auto_widen: bool) -> Self {
        self.auto_widen = auto_widen;
        self
    }

    pub fn include_all(&self) -> bool {
        self.include_all
    }

    /// Economic events come before earnings, then a stable sort by UTC
    /// instant; equal instants keep that order.
    pub async fn collect(&self, window: DateWindow, include_all_override: bool) -> Collection {
        let started = Instant::now();
        let window_deadline = self.deadline.map(|deadline| deadline.for_window(window));
        let (economic, earnings, constituents) = tokio::join!(
            within(window_deadline, SourceKind::Economic, self.economic.fetch(window)),
            within(window_deadline, SourceKind::Earnings, self.earnings.fetch(window)),
            within(
                self.deadline.map(|deadline| deadline.per_request),
                SourceKind::Constituents,
                self.constituents.fetch_symbols(),
            ),
        );

        let universe = Universe::decide(
            UniversePolicy {
                include_all: self.include_all || include_all_override,
                auto_widen: self.auto_widen,
                seed: &self.seed,
            },
            &constituents,
        );

        let economic_events = normalizer::normalize_all(&economic.records, &universe);
        let earnings_events = normalizer::normalize_all(&earnings.records, &universe);

        let dropped = economic_events.dropped.merged(earnings_events.dropped);

        let report = CollectionReport {
            window,
            economic: SourceReport::from(&economic),
            earnings: SourceReport::from(&earnings),
            constituents: SourceReport::from(&constituents),
            universe_mode: universe.mode(),
            universe_size: universe.size(),
            economic_events: economic_events.events.len(),
            earnings_events: earnings_events.events.len(),
            dropped,
        };

        let mut events = economic_events.events;
        events.extend(earnings_events.events);
        events.sort_by_key(Event::utc);

        tracing::info!(
            %window,
            economic = %report.economic.status,
            earnings = %report.earnings.status,
            constituents = %report.constituents.status,
            economic_events = report.economic_events,
            earnings_events = report.earnings_events,
            dropped = report.dropped.total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collected calendar events"
        );

        Collection { events, report }
    }
}

async fn within<T>(
    deadline: Option<Duration>,
    source: SourceKind,
    fetch: impl Future<Output = Fetched<T>>,
) -> Fetched<T> {
    let Some(deadline) = deadline else {
        return fetch.await;
    };
    match tokio::time::timeout(deadline, fetch).await {
        Ok(fetched) => fetched,
        Err(_) => {
            tracing::warn!(%source, deadline_secs = deadline.as_secs(), "source fetch abandoned");
            Fetched::failed(source, format!("no answer within {}s", deadline.as_secs()))
        }
    }
}
