use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

const SEED_DELIMITER: &str = "::";

/// Origin of a calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Economic,
    Earnings,
    Placeholder,
}

impl EventKind {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Economic => "econ",
            Self::Earnings => "earn",
            Self::Placeholder => "fallback",
        }
    }
}

/// Byte-stable input to the calendar UID.
///
/// Built only from raw provider strings, never from the resolved instant, so a
/// change in default-time rules does not re-key existing subscriber events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentitySeed(String);

impl IdentitySeed {
    /// `{tag}::{key}::{raw_date}::{raw_time}`
    pub fn from_parts(kind: EventKind, key: &str, raw_date: &str, raw_time: &str) -> Self {
        Self([kind.tag(), key, raw_date, raw_time].join(SEED_DELIMITER))
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdentitySeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical scheduled event produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub summary: String,
    pub instant: DateTime<Tz>,
    pub identity_seed: IdentitySeed,
    pub description: String,
}

impl Event {
    pub fn new(
        kind: EventKind,
        summary: impl Into<String>,
        instant: DateTime<Tz>,
        identity_seed: IdentitySeed,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let summary = summary.into();
        if summary.trim().is_empty() {
            return Err(ValidationError::EmptySummary);
        }
        if identity_seed.as_str().is_empty() {
            return Err(ValidationError::EmptyIdentitySeed);
        }

        Ok(Self {
            kind,
            summary,
            instant,
            identity_seed,
            description: description.into(),
        })
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.instant.with_timezone(&Utc)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    use super::*;

    #[test]
    fn seed_joins_raw_parts_in_order() {
        let seed = IdentitySeed::from_parts(EventKind::Earnings, "AAPL", "2024-03-13", "amc");
        assert_eq!(seed.as_str(), "earn::AAPL::2024-03-13::amc");

        let econ = IdentitySeed::from_parts(EventKind::Economic, "CPI", "2024-03-12", "");
        assert_eq!(econ.as_str(), "econ::CPI::2024-03-12::");
    }

    #[test]
    fn rejects_blank_summary_and_seed() {
        let at = New_York
            .with_ymd_and_hms(2024, 3, 12, 8, 30, 0)
            .single()
            .expect("unambiguous");

        let blank = Event::new(EventKind::Economic, "  ", at, IdentitySeed::literal("x"), "");
        assert_eq!(blank, Err(ValidationError::EmptySummary));

        let unseeded = Event::new(EventKind::Economic, "CPI", at, IdentitySeed::literal(""), "");
        assert_eq!(unseeded, Err(ValidationError::EmptyIdentitySeed));
    }

    #[test]
    fn utc_view_applies_zone_offset() {
        let at = New_York
            .with_ymd_and_hms(2024, 3, 12, 8, 30, 0)
            .single()
            .expect("unambiguous");
        let event = Event::new(EventKind::Economic, "CPI", at, IdentitySeed::literal("s"), "")
            .expect("valid event");

        assert_eq!(event.utc().to_rfc3339(), "2024-03-12T12:30:00+00:00");
    }
}
