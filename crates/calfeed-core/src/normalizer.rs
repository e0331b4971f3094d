//! Raw provider records to canonical [`Event`]s.
//!
//! Each record maps to at most one event. Records that cannot be mapped are
//! dropped individually and counted in [`DropCounts`]; they never fail the run.

use chrono::NaiveTime;
use serde::Serialize;
use thiserror::Error;

use crate::clock::{self, TimeParseError};
use crate::domain::{EarningsRecord, EconomicRecord, Event, EventKind, IdentitySeed, RawRecord, Symbol};
use crate::universe::Universe;
use crate::ValidationError;

const US_COUNTRY_NAMES: [&str; 4] = ["US", "USA", "UNITED STATES", "UNITED STATES OF AMERICA"];

const ECONOMIC_DESCRIPTION: &str = "Economic release";
const PRE_MARKET_SUFFIX: &str = " (Pre Market)";
const POST_MARKET_SUFFIX: &str = " (After Market)";

/// Release-time overrides for date-only economic records, first match wins.
///
/// Phrases are matched against whole words of the lowercased event name.
const RELEASE_TIME_RULES: [(&[&str], (u32, u32)); 3] = [
    (&["fomc", "rate decision", "fed minutes"], (14, 0)),
    (&["eia crude", "crude oil inventories"], (10, 30)),
    (
        &[
            "ism",
            "michigan",
            "consumer sentiment",
            "consumer confidence",
            "jolts",
            "job openings",
            "new home sales",
            "pending home sales",
            "existing home sales",
            "construction spending",
            "factory orders",
            "wholesale inventories",
            "business inventories",
            "leading indicators",
        ],
        (10, 0),
    ),
];

const DEFAULT_RELEASE_TIME: (u32, u32) = (8, 30);
const PRE_MARKET_TIME: (u32, u32) = (8, 0);
const POST_MARKET_TIME: (u32, u32) = (16, 10);

/// Why a single record did not become an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("country '{0}' is not the United States")]
    NotUnitedStates(String),
    #[error("record has no {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Unparsable(#[from] TimeParseError),
    #[error("invalid symbol: {0}")]
    InvalidSymbol(ValidationError),
    #[error("symbol {0} is outside the earnings universe")]
    OutsideUniverse(Symbol),
    #[error(transparent)]
    Invalid(ValidationError),
}

/// Per-reason tallies of dropped records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub not_us: usize,
    pub incomplete: usize,
    pub unparsable: usize,
    pub invalid_symbol: usize,
    pub outside_universe: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.not_us + self.incomplete + self.unparsable + self.invalid_symbol + self.outside_universe
    }

    pub fn merged(self, other: Self) -> Self {
        Self {
            not_us: self.not_us + other.not_us,
            incomplete: self.incomplete + other.incomplete,
            unparsable: self.unparsable + other.unparsable,
            invalid_symbol: self.invalid_symbol + other.invalid_symbol,
            outside_universe: self.outside_universe + other.outside_universe,
        }
    }

    fn record(&mut self, reason: &DropReason) {
        match reason {
            DropReason::NotUnitedStates(_) => self.not_us += 1,
            DropReason::MissingField(_) => self.incomplete += 1,
            DropReason::Unparsable(_) | DropReason::Invalid(_) => self.unparsable += 1,
            DropReason::InvalidSymbol(_) => self.invalid_symbol += 1,
            DropReason::OutsideUniverse(_) => self.outside_universe += 1,
        }
    }
}

/// Events in record order plus what was dropped on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub events: Vec<Event>,
    pub dropped: DropCounts,
}

/// Maps every record, keeping input order.
pub fn normalize_all(records: &[RawRecord], universe: &Universe) -> Normalized {
    let mut normalized = Normalized::default();
    for record in records {
        let outcome = match record {
            RawRecord::Economic(econ) => normalize_economic(econ),
            RawRecord::Earnings(earnings) => normalize_earnings(earnings, universe),
        };
        match outcome {
            Ok(event) => normalized.events.push(event),
            Err(reason) => {
                if !matches!(reason, DropReason::NotUnitedStates(_) | DropReason::OutsideUniverse(_)) {
                    tracing::debug!(%reason, "dropping provider record");
                }
                normalized.dropped.record(&reason);
            }
        }
    }
    normalized
}

pub fn normalize_economic(record: &EconomicRecord) -> Result<Event, DropReason> {
    let country = record.country().unwrap_or("").trim().to_uppercase();
    if !US_COUNTRY_NAMES.contains(&country.as_str()) {
        return Err(DropReason::NotUnitedStates(country));
    }

    let name = record.display_name().ok_or(DropReason::MissingField("event name"))?;
    let raw_date = record.raw_date().ok_or(DropReason::MissingField("date"))?;
    let raw_time = record.raw_time();

    let stamp = clock::parse_stamp(raw_date, raw_time)?;
    let instant = stamp.or_time(default_release_time(name));

    let mut description = String::from(ECONOMIC_DESCRIPTION);
    for (label, value) in [
        ("Impact", &record.impact),
        ("Estimate", &record.estimate),
        ("Previous", &record.previous),
        ("Actual", &record.actual),
    ] {
        push_detail(&mut description, label, value.as_deref());
    }

    Event::new(
        EventKind::Economic,
        format!("{name} (Economic)"),
        instant,
        IdentitySeed::from_parts(EventKind::Economic, name, raw_date, raw_time.unwrap_or("")),
        description,
    )
    .map_err(DropReason::Invalid)
}

pub fn normalize_earnings(record: &EarningsRecord, universe: &Universe) -> Result<Event, DropReason> {
    let symbol = Symbol::parse(record.symbol.as_deref().unwrap_or(""))
        .map_err(DropReason::InvalidSymbol)?;
    if !universe.admits(&symbol) {
        return Err(DropReason::OutsideUniverse(symbol));
    }

    let raw_date = record.raw_date().ok_or(DropReason::MissingField("date"))?;
    let label = record.timing_label();
    let company = record.company().unwrap_or(symbol.as_str());

    let stamp = clock::parse_stamp(raw_date, None)?;
    let (suffix, instant) = match Session::classify(label) {
        Session::PreMarket => (PRE_MARKET_SUFFIX, stamp.pinned_to(at(PRE_MARKET_TIME))),
        Session::PostMarket => (POST_MARKET_SUFFIX, stamp.pinned_to(at(POST_MARKET_TIME))),
        Session::Unknown => ("", stamp.resolve()),
    };

    let mut description = format!("Earnings: {symbol} {label}").trim().to_owned();
    push_detail(&mut description, "EPS estimate", record.eps_estimated.as_deref());
    push_detail(&mut description, "Revenue estimate", record.revenue_estimated.as_deref());
    if let Some(note) = universe.provenance_note() {
        description.push('\n');
        description.push_str(note);
    }

    Event::new(
        EventKind::Earnings,
        format!("{company} ({symbol}) - Earnings{suffix}"),
        instant,
        IdentitySeed::from_parts(EventKind::Earnings, symbol.as_str(), raw_date, label),
        description,
    )
    .map_err(DropReason::Invalid)
}

/// Trading session an earnings call falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    PreMarket,
    PostMarket,
    Unknown,
}

impl Session {
    /// Classifies a free-text timing label; pre-market wins when both match.
    pub fn classify(label: &str) -> Self {
        let lowered = label.to_lowercase();
        // "8:00am" splits into "8" and "00am"; the digits are dropped so "am" is seen.
        let tokens = || {
            lowered
                .split(|c: char| !c.is_ascii_alphanumeric())
                .map(|t| t.trim_start_matches(|c: char| c.is_ascii_digit()))
                .filter(|t| !t.is_empty())
        };

        if tokens().any(|t| t == "bmo" || t == "am" || t.starts_with("before") || t.starts_with("pre")) {
            Self::PreMarket
        } else if tokens().any(|t| t == "amc" || t == "pm" || t.starts_with("after") || t.starts_with("post")) {
            Self::PostMarket
        } else {
            Self::Unknown
        }
    }
}

/// Local release time for an economic event whose provider gave only a date.
pub fn default_release_time(name: &str) -> NaiveTime {
    let words = format!(
        " {} ",
        name.to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    );

    RELEASE_TIME_RULES
        .iter()
        .find(|(phrases, _)| phrases.iter().any(|phrase| words.contains(&format!(" {phrase} "))))
        .map_or(at(DEFAULT_RELEASE_TIME), |(_, time)| at(*time))
}

fn at((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn push_detail(description: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
        description.push('\n');
        description.push_str(label);
        description.push_str(": ");
        description.push_str(value);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::source::{Fetched, SourceKind};
    use crate::universe::{UniversePolicy, UNVERIFIED_UNIVERSE_NOTE};

    fn econ(country: &str, event: &str, date: &str) -> EconomicRecord {
        EconomicRecord {
            country: Some(country.to_owned()),
            event: Some(event.to_owned()),
            date: Some(date.to_owned()),
            ..EconomicRecord::default()
        }
    }

    fn earnings(symbol: &str, date: &str, time: &str) -> EarningsRecord {
        EarningsRecord {
            symbol: Some(symbol.to_owned()),
            date: Some(date.to_owned()),
            time: Some(time.to_owned()),
            ..EarningsRecord::default()
        }
    }

    fn universe(seed: &[&str], include_all: bool, auto_widen: bool, live: Fetched<Symbol>) -> Universe {
        let seed: BTreeSet<Symbol> = Symbol::parse_all(seed.iter().copied());
        Universe::decide(
            UniversePolicy {
                include_all,
                auto_widen,
                seed: &seed,
            },
            &live,
        )
    }

    fn seed_only(seed: &[&str]) -> Universe {
        universe(
            seed,
            false,
            false,
            Fetched::complete(SourceKind::Constituents, Vec::new()),
        )
    }

    fn local(event: &Event) -> String {
        event.instant.format("%Y-%m-%d %H:%M").to_string()
    }

    #[test]
    fn economic_record_gets_summary_seed_and_default_time() {
        let event = normalize_economic(&econ("US", "CPI", "2024-03-12")).expect("kept");

        assert_eq!(event.summary, "CPI (Economic)");
        assert_eq!(event.identity_seed.as_str(), "econ::CPI::2024-03-12::");
        assert_eq!(local(&event), "2024-03-12 08:30");
        assert_eq!(event.utc().to_rfc3339(), "2024-03-12T12:30:00+00:00");
        assert_eq!(event.description, "Economic release");
    }

    #[test]
    fn economic_country_must_be_united_states() {
        for country in ["us", "USA", "United States", "united states of america"] {
            assert!(normalize_economic(&econ(country, "CPI", "2024-03-12")).is_ok(), "{country}");
        }
        assert_eq!(
            normalize_economic(&econ("Germany", "Ifo", "2024-03-12")),
            Err(DropReason::NotUnitedStates(String::from("GERMANY")))
        );

        let mut code_only = econ("", "CPI", "2024-03-12");
        code_only.country = None;
        code_only.country_code = Some(String::from("US"));
        assert!(normalize_economic(&code_only).is_ok());
    }

    #[test]
    fn economic_record_without_name_or_date_is_dropped() {
        let mut nameless = econ("US", "", "2024-03-12");
        nameless.event = None;
        assert_eq!(
            normalize_economic(&nameless),
            Err(DropReason::MissingField("event name"))
        );

        let mut dateless = econ("US", "CPI", "");
        dateless.date = None;
        assert_eq!(normalize_economic(&dateless), Err(DropReason::MissingField("date")));
    }

    #[test]
    fn explicit_time_column_beats_keyword_default() {
        let mut record = econ("US", "FOMC Statement", "2024-03-20");
        record.time = Some(String::from("13:45"));

        let event = normalize_economic(&record).expect("kept");

        assert_eq!(local(&event), "2024-03-20 13:45");
        assert_eq!(event.identity_seed.as_str(), "econ::FOMC Statement::2024-03-20::13:45");
    }

    #[test]
    fn release_time_keywords() {
        let cases = [
            ("Fed Interest Rate Decision", "14:00"),
            ("FOMC Minutes", "14:00"),
            ("EIA Crude Oil Stocks Change", "10:30"),
            ("Crude Oil Inventories", "10:30"),
            ("ISM Manufacturing PMI", "10:00"),
            ("Michigan Consumer Sentiment Prel", "10:00"),
            ("JOLTs Job Openings", "10:00"),
            ("Pending Home Sales MoM", "10:00"),
            ("CB Leading Indicators", "10:00"),
            ("Nonfarm Payrolls", "08:30"),
            ("Tourism Arrivals", "08:30"),
        ];
        for (name, expected) in cases {
            assert_eq!(
                default_release_time(name).format("%H:%M").to_string(),
                expected,
                "{name}"
            );
        }
    }

    #[test]
    fn economic_description_lists_provider_detail() {
        let mut record = econ("US", "CPI", "2024-03-12");
        record.impact = Some(String::from("High"));
        record.estimate = Some(String::from("0.4"));
        record.previous = Some(String::from(" "));

        let event = normalize_economic(&record).expect("kept");

        assert_eq!(event.description, "Economic release\nImpact: High\nEstimate: 0.4");
    }

    #[test]
    fn session_labels_are_classified_by_token() {
        assert_eq!(Session::classify("BMO"), Session::PreMarket);
        assert_eq!(Session::classify("Before Market Open"), Session::PreMarket);
        assert_eq!(Session::classify("pre-market"), Session::PreMarket);
        assert_eq!(Session::classify("am"), Session::PreMarket);
        assert_eq!(Session::classify("AMC"), Session::PostMarket);
        assert_eq!(Session::classify("After Market Close"), Session::PostMarket);
        assert_eq!(Session::classify("post"), Session::PostMarket);
        assert_eq!(Session::classify("pm"), Session::PostMarket);
        assert_eq!(Session::classify("8:00AM"), Session::PreMarket);
        assert_eq!(Session::classify("7:30 am ET"), Session::PreMarket);
        assert_eq!(Session::classify("4:05PM"), Session::PostMarket);
        assert_eq!(Session::classify("16:30"), Session::Unknown);
        assert_eq!(Session::classify(""), Session::Unknown);
        assert_eq!(Session::classify("--"), Session::Unknown);
        assert_eq!(Session::classify("time-not-supplied"), Session::Unknown);
    }

    #[test]
    fn earnings_sessions_pin_local_time() {
        let universe = seed_only(&["AAPL"]);

        let pre = normalize_earnings(&earnings("AAPL", "2024-03-13", "BMO"), &universe).expect("kept");
        assert_eq!(pre.summary, "AAPL (AAPL) - Earnings (Pre Market)");
        assert_eq!(local(&pre), "2024-03-13 08:00");

        let post = normalize_earnings(&earnings("AAPL", "2024-03-13", "AMC"), &universe).expect("kept");
        assert_eq!(post.summary, "AAPL (AAPL) - Earnings (After Market)");
        assert_eq!(local(&post), "2024-03-13 16:10");

        let unknown = normalize_earnings(&earnings("AAPL", "2024-03-13", ""), &universe).expect("kept");
        assert_eq!(unknown.summary, "AAPL (AAPL) - Earnings");
        assert_eq!(local(&unknown), "2024-03-13 00:00");
        assert_eq!(unknown.description, "Earnings: AAPL");
    }

    #[test]
    fn unlabelled_earnings_keep_provider_time() {
        let universe = seed_only(&["AAPL"]);

        let event = normalize_earnings(&earnings("AAPL", "2024-03-13 17:00:00", ""), &universe)
            .expect("kept");

        assert_eq!(local(&event), "2024-03-13 17:00");
    }

    #[test]
    fn earnings_use_company_name_and_raw_label_in_seed() {
        let universe = seed_only(&["AAPL"]);
        let mut record = earnings("aapl", "2024-03-13", " amc ");
        record.company_name = Some(String::from("Apple Inc."));
        record.eps_estimated = Some(String::from("2.1"));

        let event = normalize_earnings(&record, &universe).expect("kept");

        assert_eq!(event.summary, "Apple Inc. (AAPL) - Earnings (After Market)");
        assert_eq!(event.identity_seed.as_str(), "earn::AAPL::2024-03-13::amc");
        assert_eq!(event.description, "Earnings: AAPL amc\nEPS estimate: 2.1");
    }

    #[test]
    fn earnings_outside_universe_or_invalid_are_dropped() {
        let universe = seed_only(&["AAPL"]);

        assert_eq!(
            normalize_earnings(&earnings("MSFT", "2024-03-13", "amc"), &universe),
            Err(DropReason::OutsideUniverse(Symbol::parse("MSFT").expect("valid")))
        );
        assert!(matches!(
            normalize_earnings(&earnings("", "2024-03-13", "amc"), &universe),
            Err(DropReason::InvalidSymbol(ValidationError::EmptySymbol))
        ));
        assert!(matches!(
            normalize_earnings(&earnings("AAPL", "someday", "amc"), &universe),
            Err(DropReason::Unparsable(TimeParseError::Date(_)))
        ));
    }

    #[test]
    fn include_all_keeps_foreign_numeric_tickers() {
        let everything = universe(
            &["AAPL"],
            true,
            false,
            Fetched::complete(SourceKind::Constituents, Vec::new()),
        );

        let sony = normalize_earnings(&earnings("6758.T", "2024-03-13", "bmo"), &everything)
            .expect("kept");
        let samsung = normalize_earnings(&earnings("005930.KS", "2024-03-14", ""), &everything)
            .expect("kept");

        assert_eq!(sony.summary, "6758.T (6758.T) - Earnings (Pre Market)");
        assert_eq!(samsung.identity_seed.as_str(), "earn::005930.KS::2024-03-14::");
    }

    #[test]
    fn auto_widened_universe_annotates_descriptions() {
        let widened = universe(
            &["AAPL"],
            false,
            true,
            Fetched::failed(SourceKind::Constituents, "timeout"),
        );

        let event = normalize_earnings(&earnings("ZM", "2024-03-13", "amc"), &widened).expect("kept");

        assert!(event.description.ends_with(UNVERIFIED_UNIVERSE_NOTE));
    }

    #[test]
    fn normalize_all_counts_drops_and_keeps_order() {
        let universe = seed_only(&["AAPL"]);
        let records = vec![
            RawRecord::Economic(econ("US", "CPI", "2024-03-12")),
            RawRecord::Economic(econ("DE", "Ifo", "2024-03-12")),
            RawRecord::Earnings(earnings("MSFT", "2024-03-13", "amc")),
            RawRecord::Earnings(earnings("AAPL", "garbage", "amc")),
            RawRecord::Earnings(earnings("AAPL", "2024-03-13", "amc")),
        ];

        let normalized = normalize_all(&records, &universe);

        let summaries = normalized
            .events
            .iter()
            .map(|event| event.summary.as_str())
            .collect::<Vec<_>>();
        assert_eq!(summaries, vec!["CPI (Economic)", "AAPL (AAPL) - Earnings (After Market)"]);
        assert_eq!(normalized.dropped.not_us, 1);
        assert_eq!(normalized.dropped.outside_universe, 1);
        assert_eq!(normalized.dropped.unparsable, 1);
        assert_eq!(normalized.dropped.total(), 3);
    }
}
