use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Validation and contract errors exposed by `sentiboard-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid risk level '{value}', expected one of low, medium, high")]
    InvalidRiskLevel { value: String },
    #[error("invalid hold time '{value}', expected one of short, medium, long")]
    InvalidHoldTime { value: String },
    #[error("invalid tab '{value}', expected one of opinion, news, history")]
    InvalidTab { value: String },
    #[error("invalid time range '{value}', expected one of 7d, 30d")]
    InvalidTimeRange { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("invalid email address '{value}'")]
    InvalidEmail { value: String },
}

/// Normalized failure classification for every outbound fetch.
///
/// The kinds mirror the recovery policy: `Network`, `Timeout`, and
/// `Http` with a 5xx status are recoverable via cached or mock
/// fallback; `Parse` is fatal for the affected view; `Cancelled` is
/// never shown to users; `Auth` clears the token and short-circuits
/// any fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Timeout,
    Http,
    Parse,
    Cancelled,
    Auth,
    Unknown,
}

/// Structured fetch error carried through the orchestrator and views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    status: Option<u16>,
    message: String,
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            status: None,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Timeout,
            status: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Http,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Parse,
            status: None,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: FetchErrorKind::Cancelled,
            status: None,
            message: String::from("request cancelled"),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Auth,
            status: Some(401),
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Unknown,
            status: None,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, FetchErrorKind::Cancelled)
    }

    /// Whether the cached/mock fallback path applies to this error.
    ///
    /// Network and timeout failures recover locally; HTTP 5xx follows
    /// the same path. Client errors, parse failures, and auth errors
    /// are surfaced directly.
    pub fn recoverable(&self) -> bool {
        match self.kind {
            FetchErrorKind::Network | FetchErrorKind::Timeout => true,
            FetchErrorKind::Http => self.status.is_some_and(|status| status >= 500),
            _ => false,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::Network => "fetch.network",
            FetchErrorKind::Timeout => "fetch.timeout",
            FetchErrorKind::Http => "fetch.http",
            FetchErrorKind::Parse => "fetch.parse",
            FetchErrorKind::Cancelled => "fetch.cancelled",
            FetchErrorKind::Auth => "fetch.auth",
            FetchErrorKind::Unknown => "fetch.unknown",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_recoverable() {
        assert!(FetchError::http(500, "upstream down").recoverable());
        assert!(FetchError::http(503, "unavailable").recoverable());
        assert!(FetchError::network("refused").recoverable());
        assert!(FetchError::timeout("deadline").recoverable());
    }

    #[test]
    fn client_errors_are_not_recoverable() {
        assert!(!FetchError::http(404, "not found").recoverable());
        assert!(!FetchError::auth("expired token").recoverable());
        assert!(!FetchError::parse("bad payload").recoverable());
        assert!(!FetchError::cancelled().recoverable());
    }

    #[test]
    fn display_appends_code() {
        let error = FetchError::timeout("deadline exceeded");
        assert_eq!(error.to_string(), "deadline exceeded (fetch.timeout)");
    }
}
