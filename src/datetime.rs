//! Timestamp handling for API payloads.
//!
//! The Metafold API formats every datetime as RFC 1123 in GMT, e.g.
//! `Mon, 01 Jan 2024 00:00:00 GMT`. [`AsDateTime`] converts such strings to
//! `DateTime<Utc>` and passes already-converted values through unchanged, so
//! the conversion can be applied any number of times.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Layout of an API timestamp without its zone suffix.
const RFC1123_LAYOUT: &str = "%a, %d %b %Y %H:%M:%S";

#[derive(Debug, Error, PartialEq)]
pub enum TimestampError {
    #[error("timestamp {0:?} is not in GMT")]
    NotGmt(String),

    #[error("invalid timestamp {value:?}: {source}")]
    Invalid {
        value: String,
        source: chrono::ParseError,
    },
}

/// Conversion into a UTC datetime.
pub trait AsDateTime {
    fn as_datetime(self) -> Result<DateTime<Utc>, TimestampError>;
}

impl AsDateTime for DateTime<Utc> {
    fn as_datetime(self) -> Result<DateTime<Utc>, TimestampError> {
        Ok(self)
    }
}

impl AsDateTime for &str {
    fn as_datetime(self) -> Result<DateTime<Utc>, TimestampError> {
        let trimmed = self.trim();
        let naive = trimmed
            .strip_suffix(" GMT")
            .or_else(|| trimmed.strip_suffix(" UTC"))
            .ok_or_else(|| TimestampError::NotGmt(self.to_string()))?;
        NaiveDateTime::parse_from_str(naive, RFC1123_LAYOUT)
            .map(|dt| dt.and_utc())
            .map_err(|source| TimestampError::Invalid {
                value: self.to_string(),
                source,
            })
    }
}

impl AsDateTime for &String {
    fn as_datetime(self) -> Result<DateTime<Utc>, TimestampError> {
        self.as_str().as_datetime()
    }
}

/// Formats a datetime the way the API does.
pub fn to_rfc1123(dt: &DateTime<Utc>) -> String {
    format!("{} GMT", dt.format(RFC1123_LAYOUT))
}

/// Serde adapter for RFC 1123 timestamps.
///
/// Deserialization also accepts RFC 3339 strings, which is what a
/// `DateTime<Utc>` serialized by other tooling looks like.
pub mod rfc1123 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::{AsDateTime, to_rfc1123};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_rfc1123(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str().as_datetime() {
            Ok(dt) => Ok(dt),
            Err(err) => DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| de::Error::custom(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_api_format() {
        let dt = "Mon, 01 Jan 2024 00:00:00 GMT".as_datetime().unwrap();
        assert_eq!(dt, new_year());
    }

    #[test]
    fn conversion_is_idempotent() {
        let once = "Tue, 05 Mar 2024 13:45:10 GMT".as_datetime().unwrap();
        let twice = once.as_datetime().unwrap();
        assert_eq!(once, twice);
        assert_eq!(to_rfc1123(&twice), "Tue, 05 Mar 2024 13:45:10 GMT");
    }

    #[test]
    fn rejects_non_gmt_zone() {
        let err = "Mon, 01 Jan 2024 00:00:00 +0200".as_datetime().unwrap_err();
        assert!(matches!(err, TimestampError::NotGmt(_)));
    }

    #[test]
    fn rejects_wrong_weekday() {
        let err = "Fri, 01 Jan 2024 00:00:00 GMT".as_datetime().unwrap_err();
        assert!(matches!(err, TimestampError::Invalid { .. }));
    }

    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
    struct Stamped {
        #[serde(with = "rfc1123")]
        at: DateTime<Utc>,
    }

    #[test]
    fn serde_adapter_writes_api_format_and_reads_it_back() {
        let value = Stamped { at: new_year() };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"at":"Mon, 01 Jan 2024 00:00:00 GMT"}"#);
        let parsed: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn serde_adapter_accepts_rfc3339() {
        let parsed: Stamped = serde_json::from_str(r#"{"at":"2024-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(parsed.at, new_year());
    }

    #[test]
    fn serde_adapter_rejects_garbage() {
        assert!(serde_json::from_str::<Stamped>(r#"{"at":"yesterday"}"#).is_err());
    }
}
