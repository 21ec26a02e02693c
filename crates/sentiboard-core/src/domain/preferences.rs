use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Investor risk tolerance forwarded to the analysis endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ValidationError::InvalidRiskLevel {
                value: other.to_owned(),
            }),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intended holding horizon; `wire_value` matches the upstream
/// `hold_time` parameter vocabulary (`short-term` and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldTime {
    Short,
    Medium,
    Long,
}

impl HoldTime {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "short" | "short-term" => Ok(Self::Short),
            "medium" | "medium-term" => Ok(Self::Medium),
            "long" | "long-term" => Ok(Self::Long),
            other => Err(ValidationError::InvalidHoldTime {
                value: other.to_owned(),
            }),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    pub const fn wire_value(self) -> &'static str {
        match self {
            Self::Short => "short-term",
            Self::Medium => "medium-term",
            Self::Long => "long-term",
        }
    }
}

impl Display for HoldTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-symbol investment preferences driving the analysis pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub risk: RiskLevel,
    pub hold: HoldTime,
    pub detailed: bool,
}

impl Preferences {
    pub const fn detail_level(self) -> &'static str {
        if self.detailed {
            "detailed"
        } else {
            "summary"
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            risk: RiskLevel::Medium,
            hold: HoldTime::Medium,
            detailed: false,
        }
    }
}

/// Dashboard tab selection; purely a UI concern and never a fetch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    Opinion,
    News,
    History,
}

impl ActiveTab {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "opinion" => Ok(Self::Opinion),
            "news" => Ok(Self::News),
            "history" => Ok(Self::History),
            other => Err(ValidationError::InvalidTab {
                value: other.to_owned(),
            }),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opinion => "opinion",
            Self::News => "news",
            Self::History => "history",
        }
    }
}

/// Sentiment-series lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl TimeRange {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "7d" => Ok(Self::SevenDays),
            "30d" => Ok(Self::ThirtyDays),
            other => Err(ValidationError::InvalidTimeRange {
                value: other.to_owned(),
            }),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
        }
    }

    pub const fn days(self) -> u32 {
        match self {
            Self::SevenDays => 7,
            Self::ThirtyDays => 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_medium_medium_summary() {
        let prefs = Preferences::default();
        assert_eq!(prefs.risk, RiskLevel::Medium);
        assert_eq!(prefs.hold, HoldTime::Medium);
        assert!(!prefs.detailed);
        assert_eq!(prefs.detail_level(), "summary");
    }

    #[test]
    fn hold_time_accepts_wire_vocabulary() {
        assert_eq!(HoldTime::parse("short-term").unwrap(), HoldTime::Short);
        assert_eq!(HoldTime::parse("long").unwrap(), HoldTime::Long);
        assert_eq!(HoldTime::Long.wire_value(), "long-term");
    }

    #[test]
    fn rejects_unknown_risk() {
        let err = RiskLevel::parse("reckless").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidRiskLevel { .. }));
    }

    #[test]
    fn preferences_round_trip_through_json() {
        let prefs = Preferences {
            risk: RiskLevel::High,
            hold: HoldTime::Short,
            detailed: true,
        };
        let encoded = serde_json::to_string(&prefs).expect("must serialize");
        let decoded: Preferences = serde_json::from_str(&encoded).expect("must deserialize");
        assert_eq!(decoded, prefs);
    }
}
