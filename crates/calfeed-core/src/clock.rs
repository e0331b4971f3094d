//! Date/time normalization into the exchange's reference zone.
//!
//! Providers hand back dates as `2024-03-12`, datetimes with or without an
//! offset, and sometimes a separate time-of-day column (`08:30`, `8:30 AM`).
//! Everything is resolved to a zone-aware instant in [`REFERENCE_ZONE`]; values
//! without an offset are taken to already be exchange-local.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Exchange-local zone every event is anchored to before conversion to UTC.
pub const REFERENCE_ZONE: Tz = chrono_tz::America::New_York;

const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

const NAIVE_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const TIME_OF_DAY_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M%p"];

/// Recoverable parse failure; the caller drops the offending record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("date value is empty")]
    Empty,
    #[error("unrecognized date '{0}'")]
    Date(String),
    #[error("unrecognized time of day '{0}'")]
    TimeOfDay(String),
}

/// A parsed provider timestamp, keeping track of whether a time-of-day was present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStamp {
    DateOnly(NaiveDate),
    At(DateTime<Tz>),
}

impl LocalStamp {
    pub fn local_date(&self) -> NaiveDate {
        match self {
            Self::DateOnly(date) => *date,
            Self::At(instant) => instant.date_naive(),
        }
    }

    /// Keeps an explicit time; fills date-only values with `default`.
    pub fn or_time(self, default: NaiveTime) -> DateTime<Tz> {
        match self {
            Self::DateOnly(date) => localize(date.and_time(default)),
            Self::At(instant) => instant,
        }
    }

    /// Pins the local date to `time`, discarding any provider time-of-day.
    pub fn pinned_to(self, time: NaiveTime) -> DateTime<Tz> {
        localize(self.local_date().and_time(time))
    }

    /// Date-only values resolve to local midnight.
    pub fn resolve(self) -> DateTime<Tz> {
        self.or_time(NaiveTime::MIN)
    }
}

/// Parses `date` (optionally joined with a separate `time` column) into a reference-zone instant.
pub fn to_reference_zone(date: &str, time: Option<&str>) -> Result<DateTime<Tz>, TimeParseError> {
    parse_stamp(date, time).map(LocalStamp::resolve)
}

pub fn to_utc(instant: DateTime<Tz>) -> DateTime<Utc> {
    instant.with_timezone(&Utc)
}

pub fn today_in_reference_zone(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&REFERENCE_ZONE).date_naive()
}

/// Parses provider date/time strings, preserving date-only granularity.
///
/// A non-empty `time` overrides any time-of-day embedded in `date`.
pub fn parse_stamp(date: &str, time: Option<&str>) -> Result<LocalStamp, TimeParseError> {
    let date = date.trim();
    if date.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let stamp = parse_date_field(date)?;
    match time.map(str::trim).filter(|value| !value.is_empty()) {
        Some(time) => {
            let time_of_day = parse_time_of_day(time)?;
            Ok(LocalStamp::At(stamp.pinned_to(time_of_day)))
        }
        None => Ok(stamp),
    }
}

/// Exchange-local wall time to instant.
///
/// Ambiguous fall-back times take the earlier instant; times inside the
/// spring-forward gap move one hour later.
pub fn localize(naive: NaiveDateTime) -> DateTime<Tz> {
    REFERENCE_ZONE
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            REFERENCE_ZONE
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| REFERENCE_ZONE.from_utc_datetime(&naive))
}

fn parse_date_field(value: &str) -> Result<LocalStamp, TimeParseError> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Ok(LocalStamp::At(with_offset.with_timezone(&REFERENCE_ZONE)));
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(with_offset) = DateTime::parse_from_str(value, format) {
            return Ok(LocalStamp::At(with_offset.with_timezone(&REFERENCE_ZONE)));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(LocalStamp::At(localize(naive)));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(LocalStamp::DateOnly)
        .map_err(|_| TimeParseError::Date(value.to_owned()))
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, TimeParseError> {
    let upper = value.to_ascii_uppercase();
    let candidate = hour_only_meridiem(&upper).unwrap_or(upper);

    TIME_OF_DAY_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&candidate, format).ok())
        .ok_or_else(|| TimeParseError::TimeOfDay(value.to_owned()))
}

/// `8 AM` / `8AM` carry no minutes, which chrono refuses to parse.
fn hour_only_meridiem(value: &str) -> Option<String> {
    let (hour, meridiem) = value
        .strip_suffix("AM")
        .map(|hour| (hour, "AM"))
        .or_else(|| value.strip_suffix("PM").map(|hour| (hour, "PM")))?;
    let hour = hour.trim();
    if hour.is_empty() || hour.len() > 2 || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{hour}:00 {meridiem}"))
}
