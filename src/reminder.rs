use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::{parse_date, parse_time};

/// Naive ISO forms accepted without an offset; read in the local zone
const NAIVE_ISO_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReminderError {
    #[error("Reminder has no usable time")]
    Empty,
    #[error("Timestamp out of range: {0}")]
    InvalidTimestamp(i64),
    #[error("Invalid ISO-8601 time: {0}")]
    InvalidIso(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid time: {0}")]
    InvalidTime(String),
    #[error("Local time does not exist: {0}")]
    NonexistentLocalTime(String),
}

/// When a user wants to be reminded about a note or task.
///
/// Deserializes from every shape the UI has produced over time: a bare
/// epoch-millisecond number, a bare ISO string, or an object carrying
/// `isoString`, `timestamp`, or a `date` + `time` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReminderSpec {
    Epoch(i64),
    Text(String),
    Parts(ReminderParts),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderParts {
    #[serde(rename = "isoString", default, skip_serializing_if = "Option::is_none")]
    pub iso_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl ReminderSpec {
    pub fn iso(value: impl Into<String>) -> Self {
        ReminderSpec::Text(value.into())
    }

    pub fn epoch_ms(ms: i64) -> Self {
        ReminderSpec::Epoch(ms)
    }

    pub fn date_time(date: impl Into<String>, time: impl Into<String>) -> Self {
        ReminderSpec::Parts(ReminderParts {
            date: Some(date.into()),
            time: Some(time.into()),
            ..ReminderParts::default()
        })
    }

    /// Normalize to milliseconds since the epoch, reading naive times in the local zone
    pub fn target_instant(&self) -> Result<i64, ReminderError> {
        self.target_instant_in(&Local)
    }

    /// Normalize to milliseconds since the epoch, reading naive times in `tz`
    pub fn target_instant_in<Tz: TimeZone>(&self, tz: &Tz) -> Result<i64, ReminderError> {
        match self {
            ReminderSpec::Epoch(ms) => epoch_instant(*ms),
            ReminderSpec::Text(text) => iso_instant(text, tz),
            ReminderSpec::Parts(parts) => parts.target_instant_in(tz),
        }
    }
}

impl ReminderParts {
    // isoString wins over timestamp, which wins over date + time
    fn target_instant_in<Tz: TimeZone>(&self, tz: &Tz) -> Result<i64, ReminderError> {
        if let Some(iso) = self.iso_string.as_deref().filter(|s| !s.is_empty()) {
            return iso_instant(iso, tz);
        }
        if let Some(ms) = self.timestamp.filter(|ms| *ms != 0) {
            return epoch_instant(ms);
        }
        match (self.date.as_deref(), self.time.as_deref()) {
            (Some(date), Some(time)) if !date.is_empty() && !time.is_empty() => {
                date_time_instant(date, time, tz)
            }
            _ => Err(ReminderError::Empty),
        }
    }
}

fn epoch_instant(ms: i64) -> Result<i64, ReminderError> {
    if ms == 0 {
        return Err(ReminderError::Empty);
    }
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.timestamp_millis())
        .ok_or(ReminderError::InvalidTimestamp(ms))
}

fn iso_instant<Tz: TimeZone>(text: &str, tz: &Tz) -> Result<i64, ReminderError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ReminderError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.timestamp_millis());
    }

    for format in NAIVE_ISO_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return local_instant(&naive, tz, text);
        }
    }

    // Date-only ISO strings are UTC midnight, not local midnight
    if let Ok(date) = parse_date(text) {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }

    Err(ReminderError::InvalidIso(text.to_string()))
}

fn date_time_instant<Tz: TimeZone>(date: &str, time: &str, tz: &Tz) -> Result<i64, ReminderError> {
    let day: NaiveDate =
        parse_date(date.trim()).map_err(|_| ReminderError::InvalidDate(date.to_string()))?;
    let clock = parse_time(time.trim()).map_err(|_| ReminderError::InvalidTime(time.to_string()))?;
    local_instant(&day.and_time(clock), tz, &format!("{}T{}", date, time))
}

fn local_instant<Tz: TimeZone>(
    naive: &NaiveDateTime,
    tz: &Tz,
    original: &str,
) -> Result<i64, ReminderError> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| ReminderError::NonexistentLocalTime(original.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    // 2025-03-14T09:30:00Z
    const INSTANT: i64 = 1_741_944_600_000;

    #[test]
    fn test_all_representations_agree() {
        let iso = ReminderSpec::iso("2025-03-14T09:30:00Z");
        let epoch = ReminderSpec::epoch_ms(INSTANT);
        let pair = ReminderSpec::date_time("2025-03-14", "09:30");

        assert_eq!(iso.target_instant_in(&Utc), Ok(INSTANT));
        assert_eq!(epoch.target_instant_in(&Utc), Ok(INSTANT));
        assert_eq!(pair.target_instant_in(&Utc), Ok(INSTANT));
    }

    #[test]
    fn test_naive_times_use_given_zone() {
        let wib = FixedOffset::east_opt(7 * 3600).expect("valid offset");
        let pair = ReminderSpec::date_time("2025-03-14", "16:30");
        assert_eq!(pair.target_instant_in(&wib), Ok(INSTANT));

        let naive_iso = ReminderSpec::iso("2025-03-14T16:30");
        assert_eq!(naive_iso.target_instant_in(&wib), Ok(INSTANT));

        let offset_iso = ReminderSpec::iso("2025-03-14T16:30:00+07:00");
        assert_eq!(offset_iso.target_instant_in(&Utc), Ok(INSTANT));
    }

    #[test]
    fn test_skipped_local_time_is_rejected() {
        // Clocks in Berlin jump from 02:00 to 03:00 on 2025-03-30
        let berlin = chrono_tz::Europe::Berlin;
        assert!(matches!(
            ReminderSpec::date_time("2025-03-30", "02:30").target_instant_in(&berlin),
            Err(ReminderError::NonexistentLocalTime(_))
        ));
        assert!(matches!(
            ReminderSpec::iso("2025-03-30T02:30").target_instant_in(&berlin),
            Err(ReminderError::NonexistentLocalTime(_))
        ));
    }

    #[test]
    fn test_repeated_local_time_takes_earliest() {
        // 02:30 happens twice in Berlin on 2025-10-26; the first is 00:30Z
        let berlin = chrono_tz::Europe::Berlin;
        assert_eq!(
            ReminderSpec::date_time("2025-10-26", "02:30").target_instant_in(&berlin),
            Ok(1_761_438_600_000)
        );
    }

    #[test]
    fn test_date_only_iso_is_utc_midnight() {
        let wib = FixedOffset::east_opt(7 * 3600).expect("valid offset");
        let spec = ReminderSpec::iso("2025-03-14");
        assert_eq!(spec.target_instant_in(&wib), Ok(1_741_910_400_000));
    }

    #[test]
    fn test_ui_object_precedence() {
        let json = r#"{"isoString":"2025-03-14T09:30:00Z","timestamp":1,"date":"2000-01-01","time":"00:00"}"#;
        let spec: ReminderSpec = serde_json::from_str(json).expect("valid json");
        assert_eq!(spec.target_instant_in(&Utc), Ok(INSTANT));

        let json = r#"{"timestamp":1741944600000,"date":"2000-01-01","time":"00:00"}"#;
        let spec: ReminderSpec = serde_json::from_str(json).expect("valid json");
        assert_eq!(spec.target_instant_in(&Utc), Ok(INSTANT));

        let json = r#"{"date":"2025-03-14","time":"09:30","timestamp":null}"#;
        let spec: ReminderSpec = serde_json::from_str(json).expect("valid json");
        assert_eq!(spec.target_instant_in(&Utc), Ok(INSTANT));
    }

    #[test]
    fn test_bare_json_shapes() {
        let spec: ReminderSpec = serde_json::from_str("1741944600000").expect("number");
        assert_eq!(spec, ReminderSpec::Epoch(INSTANT));

        let spec: ReminderSpec = serde_json::from_str(r#""2025-03-14T09:30:00Z""#).expect("string");
        assert_eq!(spec.target_instant_in(&Utc), Ok(INSTANT));
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(ReminderSpec::epoch_ms(0).target_instant_in(&Utc), Err(ReminderError::Empty));
        assert_eq!(ReminderSpec::iso("  ").target_instant_in(&Utc), Err(ReminderError::Empty));
        assert!(matches!(
            ReminderSpec::iso("besok pagi").target_instant_in(&Utc),
            Err(ReminderError::InvalidIso(_))
        ));
        assert!(matches!(
            ReminderSpec::date_time("2025-02-30", "10:00").target_instant_in(&Utc),
            Err(ReminderError::InvalidDate(_))
        ));
        assert!(matches!(
            ReminderSpec::date_time("2025-02-10", "25:00").target_instant_in(&Utc),
            Err(ReminderError::InvalidTime(_))
        ));
        assert!(matches!(
            ReminderSpec::epoch_ms(i64::MAX).target_instant_in(&Utc),
            Err(ReminderError::InvalidTimestamp(_))
        ));

        let only_date = ReminderSpec::Parts(ReminderParts {
            date: Some("2025-03-14".to_string()),
            ..ReminderParts::default()
        });
        assert_eq!(only_date.target_instant_in(&Utc), Err(ReminderError::Empty));
    }
}
