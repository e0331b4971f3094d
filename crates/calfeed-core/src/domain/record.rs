use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Economic-calendar row. Every field is optional; providers rename and drop
/// columns freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EconomicRecord {
    #[serde(default, deserialize_with = "loose_string")]
    pub country: Option<String>,
    #[serde(default, rename = "countryCode", deserialize_with = "loose_string")]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub event: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub datetime: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub date_time: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub impact: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub estimate: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub previous: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub actual: Option<String>,
}

impl EconomicRecord {
    pub fn country(&self) -> Option<&str> {
        first_present([&self.country, &self.country_code])
    }

    pub fn display_name(&self) -> Option<&str> {
        first_present([&self.event, &self.name, &self.title])
    }

    pub fn raw_date(&self) -> Option<&str> {
        first_present([&self.date, &self.datetime, &self.date_time])
    }

    pub fn raw_time(&self) -> Option<&str> {
        first_present([&self.time])
    }
}

/// Earnings-calendar row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EarningsRecord {
    #[serde(default, deserialize_with = "loose_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub company: Option<String>,
    #[serde(default, rename = "companyName", deserialize_with = "loose_string")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub hour: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub when: Option<String>,
    #[serde(default, rename = "epsEstimated", deserialize_with = "loose_string")]
    pub eps_estimated: Option<String>,
    #[serde(default, rename = "revenueEstimated", deserialize_with = "loose_string")]
    pub revenue_estimated: Option<String>,
}

impl EarningsRecord {
    pub fn company(&self) -> Option<&str> {
        first_present([&self.company, &self.company_name, &self.name])
    }

    pub fn raw_date(&self) -> Option<&str> {
        first_present([&self.date])
    }

    /// Free-text session label (`bmo`, `amc`, `After Market Close`, ...), trimmed.
    pub fn timing_label(&self) -> &str {
        first_present([&self.time, &self.hour, &self.when])
            .map(str::trim)
            .unwrap_or("")
    }
}

/// One upstream row, tagged by the provider endpoint it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Economic(EconomicRecord),
    Earnings(EarningsRecord),
}

impl RawRecord {
    /// Non-object list entries yield `None`.
    pub fn economic(value: Value) -> Option<Self> {
        value
            .is_object()
            .then(|| serde_json::from_value(value).ok().map(Self::Economic))
            .flatten()
    }

    pub fn earnings(value: Value) -> Option<Self> {
        value
            .is_object()
            .then(|| serde_json::from_value(value).ok().map(Self::Earnings))
            .flatten()
    }
}

fn first_present<const N: usize>(candidates: [&Option<String>; N]) -> Option<&str> {
    candidates
        .into_iter()
        .filter_map(Option::as_deref)
        .find(|value| !value.trim().is_empty())
}

/// Accepts strings, numbers and booleans; anything else reads as absent.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}
