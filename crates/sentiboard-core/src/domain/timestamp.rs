use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ValidationError;

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    /// Best-effort parse for heterogeneous upstream date fields.
    ///
    /// Accepts RFC3339, unix epoch seconds, and the compact
    /// `YYYYMMDDTHHMMSS` form used by news feeds. Returns `None` when
    /// nothing matches; the normalizer substitutes the current time.
    pub fn parse_lenient(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(number) => {
                let epoch = number.as_i64()?;
                OffsetDateTime::from_unix_timestamp(epoch)
                    .ok()
                    .map(|parsed| Self(parsed.to_offset(UtcOffset::UTC)))
            }
            serde_json::Value::String(text) => {
                if let Ok(parsed) = Self::parse(text) {
                    return Some(parsed);
                }

                let compact = time::format_description::parse(
                    "[year][month][day]T[hour][minute][second]",
                )
                .ok()?;
                PrimitiveDateTime::parse(text, &compact)
                    .ok()
                    .map(|parsed| Self(parsed.assume_utc()))
            }
            _ => None,
        }
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Age of this timestamp relative to now; zero when in the future.
    pub fn age(self) -> Duration {
        let elapsed = OffsetDateTime::now_utc() - self.0;
        elapsed.max(Duration::ZERO)
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcDateTime must be RFC3339 formattable")
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcDateTime::parse("2024-01-01T00:00:00+02:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn lenient_accepts_epoch_seconds() {
        let parsed = UtcDateTime::parse_lenient(&serde_json::json!(1_700_000_000))
            .expect("epoch should parse");
        assert_eq!(parsed.into_inner().unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn lenient_accepts_compact_news_format() {
        let parsed = UtcDateTime::parse_lenient(&serde_json::json!("20240102T151000"))
            .expect("compact form should parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-02T15:10:00Z");
    }

    #[test]
    fn lenient_rejects_garbage() {
        assert!(UtcDateTime::parse_lenient(&serde_json::json!("soon")).is_none());
        assert!(UtcDateTime::parse_lenient(&serde_json::json!(null)).is_none());
    }
}
