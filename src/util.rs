use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::EngineError;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days spanned by `[start, end]`, rounded up.
///
/// Example: 2026-02-12T00:00 → 2026-02-14T06:00 is 3 days.
pub fn duration_days(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let secs = end.signed_duration_since(start).num_seconds();
    let whole = secs.div_euclid(SECONDS_PER_DAY);
    if secs.rem_euclid(SECONDS_PER_DAY) > 0 {
        whole + 1
    } else {
        whole
    }
}

/// Midnight at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn add_days(dt: NaiveDateTime, days: i64) -> NaiveDateTime {
    dt + Duration::days(days)
}

/// Parse a task timestamp, accepting the shapes plans are exported in.
///
/// RFC 3339 values keep their wall-clock time and drop the offset, so a task
/// dated `2026-02-12T00:00:00-05:00` still lands on the 12th.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.contains('T') || value.contains(' ') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_local());
        }
        let formats = [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
        ];
        for fmt in formats {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
                return Some(naive);
            }
        }
        return None;
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}

/// Parse a calendar day. Full timestamps are truncated to their date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(value).map(|dt| dt.date()))
}

/// Write `content` to a sibling temp file and rename it over `path`.
pub fn atomic_write_str(path: &Path, content: &str) -> Result<(), EngineError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| EngineError::IoError(e.to_string()))?;
    Ok(())
}

/// Serde adapter for task timestamps.
pub mod flexible_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_datetime(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {}", raw)))
    }
}

/// Serde adapter for calendar days.
pub mod flexible_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
    }
}
