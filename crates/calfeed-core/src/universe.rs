//! Which earnings symbols make it into the feed.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::Symbol;
use crate::source::{FetchStatus, Fetched};

/// Appended to earnings descriptions when the universe had to be widened.
pub const UNVERIFIED_UNIVERSE_NOTE: &str =
    "Note: index membership could not be verified; all reported earnings included.";

/// How a [`Universe`] was decided for one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseMode {
    /// Include-all was requested by configuration or by the caller.
    IncludeAll,
    /// Constituent list was unusable and auto-widen kicked in.
    AutoWidened,
    /// Live constituents plus the seed list.
    Filtered,
}

/// Symbol filter applied to earnings records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    mode: UniverseMode,
    symbols: BTreeSet<Symbol>,
}

/// Inputs to [`Universe::decide`].
#[derive(Debug, Clone, Copy)]
pub struct UniversePolicy<'a> {
    pub include_all: bool,
    pub auto_widen: bool,
    pub seed: &'a BTreeSet<Symbol>,
}

impl Universe {
    /// Picks the filter for this run, in priority order: include-all, then
    /// auto-widen on an unusable live list, then live ∪ seed.
    pub fn decide(policy: UniversePolicy<'_>, live: &Fetched<Symbol>) -> Self {
        if policy.include_all {
            return Self {
                mode: UniverseMode::IncludeAll,
                symbols: BTreeSet::new(),
            };
        }

        if policy.auto_widen && live.status.is_unusable() {
            match &live.status {
                FetchStatus::Failed { reason } => tracing::warn!(
                    %reason,
                    "constituent fetch failed; widening earnings universe to all symbols"
                ),
                _ => tracing::warn!(
                    "constituent list came back empty; widening earnings universe to all symbols"
                ),
            }
            return Self {
                mode: UniverseMode::AutoWidened,
                symbols: BTreeSet::new(),
            };
        }

        if live.status.is_failed() {
            tracing::warn!(
                seed_size = policy.seed.len(),
                "constituent fetch failed; filtering earnings by seed list only"
            );
        }

        let symbols = live
            .records
            .iter()
            .chain(policy.seed.iter())
            .cloned()
            .collect();
        Self {
            mode: UniverseMode::Filtered,
            symbols,
        }
    }

    pub fn mode(&self) -> UniverseMode {
        self.mode
    }

    pub fn admits(&self, symbol: &Symbol) -> bool {
        match self.mode {
            UniverseMode::IncludeAll | UniverseMode::AutoWidened => true,
            UniverseMode::Filtered => self.symbols.contains(symbol),
        }
    }

    /// Provenance note for earnings admitted without verification.
    pub fn provenance_note(&self) -> Option<&'static str> {
        (self.mode == UniverseMode::AutoWidened).then_some(UNVERIFIED_UNIVERSE_NOTE)
    }

    /// Symbol count of a filtered universe; `None` when unrestricted.
    pub fn size(&self) -> Option<usize> {
        (self.mode == UniverseMode::Filtered).then_some(self.symbols.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;

    fn symbols(tickers: &[&str]) -> BTreeSet<Symbol> {
        Symbol::parse_all(tickers.iter().copied())
    }

    fn live(tickers: &[&str]) -> Fetched<Symbol> {
        Fetched::complete(SourceKind::Constituents, symbols(tickers).into_iter().collect())
    }

    #[test]
    fn filtered_universe_is_live_union_seed() {
        let seed = symbols(&["AAPL"]);
        let policy = UniversePolicy {
            include_all: false,
            auto_widen: false,
            seed: &seed,
        };

        let universe = Universe::decide(policy, &live(&["NVDA"]));

        assert_eq!(universe.mode(), UniverseMode::Filtered);
        assert!(universe.admits(&Symbol::parse("AAPL").expect("valid")));
        assert!(universe.admits(&Symbol::parse("NVDA").expect("valid")));
        assert!(!universe.admits(&Symbol::parse("MSFT").expect("valid")));
        assert_eq!(universe.size(), Some(2));
        assert_eq!(universe.provenance_note(), None);
    }

    #[test]
    fn empty_live_list_without_auto_widen_falls_back_to_seed() {
        let seed = symbols(&["AAPL"]);
        let policy = UniversePolicy {
            include_all: false,
            auto_widen: false,
            seed: &seed,
        };

        let universe = Universe::decide(policy, &live(&[]));

        assert!(universe.admits(&Symbol::parse("AAPL").expect("valid")));
        assert!(!universe.admits(&Symbol::parse("MSFT").expect("valid")));
    }

    #[test]
    fn include_all_wins_over_everything() {
        let seed = symbols(&["AAPL"]);
        let policy = UniversePolicy {
            include_all: true,
            auto_widen: true,
            seed: &seed,
        };

        let universe = Universe::decide(policy, &Fetched::failed(SourceKind::Constituents, "down"));

        assert_eq!(universe.mode(), UniverseMode::IncludeAll);
        assert!(universe.admits(&Symbol::parse("ZZZZ").expect("valid")));
        assert_eq!(universe.provenance_note(), None);
        assert_eq!(universe.size(), None);
    }

    #[test]
    fn auto_widen_applies_to_failed_and_empty_lists() {
        let seed = symbols(&["AAPL"]);
        let policy = UniversePolicy {
            include_all: false,
            auto_widen: true,
            seed: &seed,
        };

        for fetched in [
            Fetched::failed(SourceKind::Constituents, "timeout"),
            live(&[]),
        ] {
            let universe = Universe::decide(policy, &fetched);
            assert_eq!(universe.mode(), UniverseMode::AutoWidened);
            assert!(universe.admits(&Symbol::parse("MSFT").expect("valid")));
            assert_eq!(universe.provenance_note(), Some(UNVERIFIED_UNIVERSE_NOTE));
        }
    }

    #[test]
    fn auto_widen_is_ignored_when_live_list_is_usable() {
        let seed = symbols(&["AAPL"]);
        let policy = UniversePolicy {
            include_all: false,
            auto_widen: true,
            seed: &seed,
        };

        let universe = Universe::decide(policy, &live(&["MSFT"]));

        assert_eq!(universe.mode(), UniverseMode::Filtered);
        assert!(!universe.admits(&Symbol::parse("TSLA").expect("valid")));
    }
}
