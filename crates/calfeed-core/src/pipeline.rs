//! Aggregation, placeholder substitution and rendering, as one rebuild.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Duration, Utc};

use crate::aggregator::{Aggregator, CollectionReport};
use crate::cache::FeedBuilder;
use crate::calendar;
use crate::clock::{self, REFERENCE_ZONE};
use crate::domain::{DateWindow, Event, EventKind, IdentitySeed};
use crate::error::{FeedError, ValidationError};

const PLACEHOLDER_DESCRIPTION: &str = "Temporary fallback";

/// Events from one run, ready to render.
#[derive(Debug, Clone)]
pub struct FeedRun {
    pub events: Vec<Event>,
    pub report: CollectionReport,
    /// No real events survived and the placeholders were substituted.
    pub placeholders: bool,
}

/// Builds the calendar document for the lookahead window starting today.
#[derive(Clone)]
pub struct FeedPipeline {
    aggregator: Aggregator,
    lookahead_days: u32,
    now: fn() -> DateTime<Utc>,
}

impl FeedPipeline {
    pub fn new(aggregator: Aggregator, lookahead_days: u32) -> Self {
        Self {
            aggregator,
            lookahead_days,
            now: Utc::now,
        }
    }

    /// Replaces the wall clock, for reproducible windows and placeholders.
    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// `[today, today + lookahead_days]` in the reference zone.
    pub fn window(&self) -> DateWindow {
        let today = clock::today_in_reference_zone((self.now)());
        DateWindow::lookahead(today, self.lookahead_days)
    }

    pub async fn run(&self, include_all: bool) -> Result<FeedRun, FeedError> {
        let collection = self.aggregator.collect(self.window(), include_all).await;
        if !collection.events.is_empty() {
            return Ok(FeedRun {
                events: collection.events,
                report: collection.report,
                placeholders: false,
            });
        }

        tracing::warn!(
            economic = %collection.report.economic.status,
            earnings = %collection.report.earnings.status,
            "no events collected; substituting placeholders"
        );
        Ok(FeedRun {
            events: placeholder_events((self.now)())?,
            report: collection.report,
            placeholders: true,
        })
    }

    pub async fn render(&self, include_all: bool) -> Result<String, FeedError> {
        let run = self.run(include_all).await?;
        Ok(calendar::render_at(&run.events, (self.now)()))
    }
}

impl FeedBuilder for FeedPipeline {
    fn build<'a>(
        &'a self,
        include_all: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, FeedError>> + Send + 'a>> {
        Box::pin(self.render(include_all))
    }
}

/// Two stand-in events so subscribers never see an empty calendar.
pub fn placeholder_events(now: DateTime<Utc>) -> Result<Vec<Event>, ValidationError> {
    let local_now = now.with_timezone(&REFERENCE_ZONE);
    Ok(vec![
        Event::new(
            EventKind::Placeholder,
            "Fallback GDP (Economic)",
            local_now + Duration::days(1),
            IdentitySeed::literal("fallback-econ-1"),
            PLACEHOLDER_DESCRIPTION,
        )?,
        Event::new(
            EventKind::Placeholder,
            "Fallback Earnings (AAPL) - After Market",
            local_now + Duration::days(2),
            IdentitySeed::literal("fallback-earn-1"),
            PLACEHOLDER_DESCRIPTION,
        )?,
    ])
}
