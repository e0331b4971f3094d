//! Source adapter contract and fetch outcome types.
//!
//! Adapters never fail outright: every fetch returns a [`Fetched`] carrying
//! whatever records were retrieved plus a [`FetchStatus`] explaining how
//! complete they are. Downstream stages decide what an empty or failed fetch
//! means for them.
//!
//! # Sources
//!
//! | Kind | Trait | Record type |
//! |------|-------|-------------|
//! | Economic calendar | [`RecordSource`] | [`RawRecord::Economic`] |
//! | Earnings calendar | [`RecordSource`] | [`RawRecord::Earnings`] |
//! | Index constituents | [`ConstituentSource`] | [`Symbol`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DateWindow, RawRecord, Symbol};

/// Upstream dataset an adapter serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Economic,
    Earnings,
    Constituents,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Economic => "economic",
            Self::Earnings => "earnings",
            Self::Constituents => "constituents",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How complete a fetch was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FetchStatus {
    /// Every call succeeded and returned at least one record.
    Ok,
    /// Every call succeeded but the provider had nothing.
    Empty,
    /// Some chunk windows failed; records from the others are kept.
    Partial {
        failed_windows: Vec<String>,
        reason: String,
    },
    /// Nothing usable came back.
    Failed { reason: String },
}

impl FetchStatus {
    /// Short label used by `/debug` and the probe command.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Empty => "empty",
            Self::Partial { .. } => "partial",
            Self::Failed { .. } => "failed",
        }
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// `Empty` and `Failed` both leave the caller with no records.
    pub const fn is_unusable(&self) -> bool {
        matches!(self, Self::Empty | Self::Failed { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Partial { reason, .. } | Self::Failed { reason } => Some(reason),
            Self::Ok | Self::Empty => None,
        }
    }
}

impl Display for FetchStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Partial {
                failed_windows,
                reason,
            } => write!(
                f,
                "partial ({} window(s) failed: {reason})",
                failed_windows.len()
            ),
            Self::Failed { reason } => write!(f, "failed ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Records plus the status of the fetch that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub source: SourceKind,
    pub records: Vec<T>,
    pub status: FetchStatus,
}

impl<T> Fetched<T> {
    /// Derives `Ok`/`Empty` from the record count.
    pub fn complete(source: SourceKind, records: Vec<T>) -> Self {
        let status = if records.is_empty() {
            FetchStatus::Empty
        } else {
            FetchStatus::Ok
        };
        Self {
            source,
            records,
            status,
        }
    }

    pub fn failed(source: SourceKind, reason: impl Into<String>) -> Self {
        Self {
            source,
            records: Vec::new(),
            status: FetchStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Longest a source may take before its fetch is abandoned.
///
/// Chunked adapters issue one request per `chunk_days` slice, each bounded
/// by `per_request` including retries and backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchDeadline {
    pub per_request: Duration,
    pub chunk_days: u32,
}

impl FetchDeadline {
    /// Deadline for a span of `days` calendar days.
    pub fn for_days(self, days: u64) -> Duration {
        let requests = days.max(1).div_ceil(u64::from(self.chunk_days.max(1)));
        self.per_request
            .saturating_mul(u32::try_from(requests).unwrap_or(u32::MAX))
    }

    pub fn for_window(self, window: DateWindow) -> Duration {
        self.for_days(u64::try_from(window.days()).unwrap_or(1))
    }
}

/// Adapter for a dated calendar endpoint.
///
/// Implementations must be `Send + Sync`; the aggregator drives several of
/// them concurrently.
pub trait RecordSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetches every record dated inside `window`.
    fn fetch<'a>(
        &'a self,
        window: DateWindow,
    ) -> Pin<Box<dyn Future<Output = Fetched<RawRecord>> + Send + 'a>>;
}

/// Adapter for the index-membership endpoint.
pub trait ConstituentSource: Send + Sync {
    fn fetch_symbols<'a>(&'a self) -> Pin<Box<dyn Future<Output = Fetched<Symbol>> + Send + 'a>>;
}

/// In-memory [`RecordSource`] for deterministic offline runs.
///
/// Records outside the requested window are still returned; filtering by date
/// is the provider's job and this source stands in for its answer.
#[derive(Debug)]
pub struct StaticRecordSource {
    kind: SourceKind,
    records: Vec<RawRecord>,
    status: Option<FetchStatus>,
    calls: AtomicUsize,
}

impl StaticRecordSource {
    pub fn new(kind: SourceKind, records: Vec<RawRecord>) -> Self {
        Self {
            kind,
            records,
            status: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reports `status` instead of the one derived from the record count.
    pub fn with_status(mut self, status: FetchStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RecordSource for StaticRecordSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn fetch<'a>(
        &'a self,
        _window: DateWindow,
    ) -> Pin<Box<dyn Future<Output = Fetched<RawRecord>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut fetched = Fetched::complete(self.kind, self.records.clone());
            if let Some(status) = &self.status {
                fetched.status = status.clone();
            }
            fetched
        })
    }
}

/// In-memory [`ConstituentSource`].
#[derive(Debug)]
pub struct StaticConstituents {
    symbols: Vec<Symbol>,
    status: Option<FetchStatus>,
}

impl StaticConstituents {
    pub fn new(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
            status: None,
        }
    }

    /// A provider that answers with nothing usable.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            symbols: Vec::new(),
            status: Some(FetchStatus::Failed {
                reason: reason.into(),
            }),
        }
    }
}

impl ConstituentSource for StaticConstituents {
    fn fetch_symbols<'a>(&'a self) -> Pin<Box<dyn Future<Output = Fetched<Symbol>> + Send + 'a>> {
        Box::pin(async move {
            let mut fetched = Fetched::complete(SourceKind::Constituents, self.symbols.clone());
            if let Some(status) = &self.status {
                fetched.status = status.clone();
            }
            fetched
        })
    }
}
