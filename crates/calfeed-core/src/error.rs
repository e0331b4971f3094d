use thiserror::Error;

/// Validation and contract errors exposed by `calfeed-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("event summary cannot be empty")]
    EmptySummary,
    #[error("event identity seed cannot be empty")]
    EmptyIdentitySeed,

    #[error("date window start {start} is after end {end}")]
    InvertedWindow { start: String, end: String },
    #[error("chunk size must be at least one day")]
    ZeroChunk,
}

/// Errors raised while loading [`FeedConfig`](crate::config::FeedConfig).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} must be {expected}, got '{value}'")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Failure of a whole feed rebuild. Never shown to calendar subscribers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("feed rebuild panicked: {0}")]
    Panicked(String),
    #[error("feed rebuild exceeded {seconds}s deadline")]
    TimedOut { seconds: u64 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
