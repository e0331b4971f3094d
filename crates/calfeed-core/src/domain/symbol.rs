use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Dow Jones Industrial Average members, the static seed of the earnings universe.
pub const DOW_30: [&str; 30] = [
    "AAPL", "MSFT", "JPM", "V", "JNJ", "WMT", "PG", "DIS", "HD", "MA", "XOM", "PFE", "KO", "PEP",
    "CSCO", "CVX", "INTC", "MCD", "UNH", "BAC", "VZ", "TRV", "MMM", "NKE", "MRK", "AXP", "DOW",
    "GS", "RTX", "IBM",
];

/// Uppercased equity ticker as reported by the earnings and constituent providers.
///
/// Share-class separators (`BRK.B`, `BF-B`) and exchange suffixes
/// (`6758.T`, `005930.KS`) are kept verbatim so they match the provider lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let ticker = input.trim().to_ascii_uppercase();

        if let Some((index, ch)) = ticker.chars().enumerate().find(|(_, ch)| ch.is_control()) {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        match ticker.chars().count() {
            0 => Err(ValidationError::EmptySymbol),
            len if len > MAX_SYMBOL_LEN => Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            }),
            _ => Ok(Self(ticker)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses every entry, silently skipping tickers the providers mangle.
    pub fn parse_all<'a>(inputs: impl IntoIterator<Item = &'a str>) -> BTreeSet<Self> {
        inputs
            .into_iter()
            .filter_map(|raw| Self::parse(raw).ok())
            .collect()
    }

    pub fn dow_30() -> BTreeSet<Self> {
        Self::parse_all(DOW_30)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
