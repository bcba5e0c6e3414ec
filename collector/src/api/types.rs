//! Response shapes of the Queue-it REST API.
//!
//! Queue-it encodes most scalars as quoted strings (`"IsTest": "False"`,
//! `"Sum": "12"`), the helpers in [`coerce`] turn them into proper types and
//! reject anything they cannot read.

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

/// A waiting room as returned by the event search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaitingRoom {
    #[serde(alias = "EventID")]
    pub event_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "coerce::bool")]
    pub is_test: bool,
    #[serde(
        default,
        rename = "PreQueueStartsMinuesBefore",
        deserialize_with = "coerce::i64"
    )]
    pub pre_queue_starts_minutes_before: i64,
    #[serde(default, deserialize_with = "coerce::timestamp")]
    pub event_start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "coerce::timestamp")]
    pub event_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub queue_status_text: String,
}

impl WaitingRoom {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            display_name: String::new(),
            is_test: false,
            pre_queue_starts_minutes_before: 0,
            event_start_time: None,
            event_end_time: None,
            queue_status_text: String::new(),
        }
    }
}

/// Filter criterion of the event search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchFilter {
    pub name: &'static str,
    pub operator: &'static str,
    pub value: &'static str,
}

impl SearchFilter {
    /// Rooms that are either in the pre-queue or actively queueing.
    pub const ACTIVE_PHASES: SearchFilter = SearchFilter {
        name: "Phase",
        operator: "in",
        value: "prequeue, queue",
    };
}

/// Error payload Queue-it puts into the body of failed calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorPayload {
    #[serde(deserialize_with = "coerce::i64")]
    pub error_code: i64,
    #[serde(default)]
    pub error_text: String,
    #[serde(default)]
    pub http_status_code: u16,
}

/// Per-minute observation of a statistics detail metric.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatisticsDetailEntry {
    #[serde(deserialize_with = "coerce::f64")]
    pub sum: f64,
    #[serde(default, deserialize_with = "coerce::f64")]
    pub min_minute: f64,
    #[serde(default, deserialize_with = "coerce::f64")]
    pub max_minute: f64,
}

/// Response of the statistics detail endpoint. `Entries` is required so an
/// error payload is never mistaken for an empty window, `null` counts as empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatisticsDetail {
    #[serde(default)]
    pub version_timestamp: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default, deserialize_with = "coerce::i64")]
    pub interval: i64,
    #[serde(deserialize_with = "coerce::null_as_empty")]
    pub entries: Vec<StatisticsDetailEntry>,
    #[serde(default, deserialize_with = "coerce::i64")]
    pub sum_offset: i64,
}

pub(crate) mod coerce {
    use chrono::{
        DateTime,
        NaiveDateTime,
        Utc,
    };
    use serde::{
        de::Error as _,
        Deserialize,
        Deserializer,
    };

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Native(T),
        Quoted(String),
    }

    pub fn bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Raw::<bool>::deserialize(deserializer)? {
            Raw::Native(value) => Ok(value),
            Raw::Quoted(s) => parse_bool(&s).ok_or_else(|| D::Error::custom(format!("invalid boolean {s:?}"))),
        }
    }

    pub fn i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Raw::<i64>::deserialize(deserializer)? {
            Raw::Native(value) => Ok(value),
            Raw::Quoted(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid integer {s:?}"))),
        }
    }

    pub fn f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Raw::<f64>::deserialize(deserializer)? {
            Raw::Native(value) => Ok(value),
            Raw::Quoted(s) => parse_f64(&s).ok_or_else(|| D::Error::custom(format!("invalid number {s:?}"))),
        }
    }

    /// Absent timestamps are handled by `#[serde(default)]`, a present one has
    /// to parse.
    pub fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_timestamp(&s)
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid timestamp {s:?}: {e}")))
    }

    pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
    }

    pub fn parse_bool(s: &str) -> Option<bool> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("true") {
            Some(true)
        } else if s.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    pub fn parse_f64(s: &str) -> Option<f64> {
        s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        let s = s.trim();
        match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => Ok(ts.with_timezone(&Utc)),
            // Some Queue-it timestamps carry no offset, those are UTC.
            Err(e) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|ts| ts.and_utc())
                .map_err(|_| e),
        }
    }
}
