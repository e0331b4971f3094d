use std::future::Future;
use std::pin::Pin;

use crate::adapters::fmp::FmpClient;
use crate::domain::{DateWindow, RawRecord};
use crate::source::{Fetched, RecordSource, SourceKind};

/// FMP `economic-calendar` endpoint.
#[derive(Debug, Clone)]
pub struct EconomicCalendarAdapter {
    client: FmpClient,
}

impl EconomicCalendarAdapter {
    pub fn new(client: FmpClient) -> Self {
        Self { client }
    }
}

impl RecordSource for EconomicCalendarAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Economic
    }

    fn fetch<'a>(
        &'a self,
        window: DateWindow,
    ) -> Pin<Box<dyn Future<Output = Fetched<RawRecord>> + Send + 'a>> {
        Box::pin(async move {
            self.client
                .fetch_windowed(
                    SourceKind::Economic,
                    "economic-calendar",
                    window,
                    RawRecord::economic,
                )
                .await
        })
    }
}

/// FMP `earnings-calendar` endpoint.
#[derive(Debug, Clone)]
pub struct EarningsCalendarAdapter {
    client: FmpClient,
}

impl EarningsCalendarAdapter {
    pub fn new(client: FmpClient) -> Self {
        Self { client }
    }
}

impl RecordSource for EarningsCalendarAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Earnings
    }

    fn fetch<'a>(
        &'a self,
        window: DateWindow,
    ) -> Pin<Box<dyn Future<Output = Fetched<RawRecord>> + Send + 'a>> {
        Box::pin(async move {
            self.client
                .fetch_windowed(
                    SourceKind::Earnings,
                    "earnings-calendar",
                    window,
                    RawRecord::earnings,
                )
                .await
        })
    }
}
