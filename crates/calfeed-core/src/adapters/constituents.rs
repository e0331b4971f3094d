use std::future::Future;
use std::pin::Pin;

use crate::adapters::fmp::FmpClient;
use crate::domain::Symbol;
use crate::source::{ConstituentSource, Fetched, SourceKind};

/// FMP S&P 500 membership list.
#[derive(Debug, Clone)]
pub struct ConstituentAdapter {
    client: FmpClient,
}

impl ConstituentAdapter {
    pub fn new(client: FmpClient) -> Self {
        Self { client }
    }
}

impl ConstituentSource for ConstituentAdapter {
    fn fetch_symbols<'a>(&'a self) -> Pin<Box<dyn Future<Output = Fetched<Symbol>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.client.legacy_url("sp500_constituent");
            let items = match self.client.get_list(&url, &[]).await {
                Ok(items) => items,
                Err(reason) => {
                    tracing::warn!(%reason, "constituent list unavailable");
                    return Fetched::failed(SourceKind::Constituents, reason);
                }
            };

            let mut symbols = items
                .iter()
                .filter_map(|row| row.get("symbol").and_then(|value| value.as_str()))
                .filter_map(|raw| Symbol::parse(raw).ok())
                .collect::<Vec<_>>();
            symbols.sort();
            symbols.dedup();

            Fetched::complete(SourceKind::Constituents, symbols)
        })
    }
}
