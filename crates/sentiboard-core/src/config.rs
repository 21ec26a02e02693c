//! Environment-backed configuration.
//!
//! Every knob reads a `SENTIBOARD_`-prefixed variable first and falls
//! back to the unprefixed name, so deployments sharing keys with other
//! tooling keep working.
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `SENTIBOARD_API_BASE_URL` | `/api` | analysis service base URL |
//! | `SENTIBOARD_API_TOKEN` | unset | bearer token for the gateway |
//! | `SENTIBOARD_USE_MOCK` | `false` | force mock providers |
//! | `SENTIBOARD_STATE_FILE` | unset | durable store path (memory-only when unset) |
//! | `SENTIBOARD_ALPHAVANTAGE_API_KEY` | unset | search provider A |
//! | `SENTIBOARD_RAPIDAPI_KEY` | unset | search provider B (Yahoo) |
//! | `SENTIBOARD_FINNHUB_API_KEY` | unset | search provider C |

use std::env;
use std::path::PathBuf;

/// Runtime configuration for the data layer.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub use_mock: bool,
    pub state_file: Option<PathBuf>,
    pub alphavantage_api_key: Option<String>,
    pub rapidapi_key: Option<String>,
    pub finnhub_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_or("SENTIBOARD_API_BASE_URL", "API_BASE_URL")
                .unwrap_or_else(|| String::from("/api")),
            api_token: env_or("SENTIBOARD_API_TOKEN", "API_TOKEN"),
            use_mock: env_or("SENTIBOARD_USE_MOCK", "USE_MOCK")
                .map(|value| is_truthy(&value))
                .unwrap_or(false),
            state_file: env_or("SENTIBOARD_STATE_FILE", "STATE_FILE").map(PathBuf::from),
            alphavantage_api_key: env_or("SENTIBOARD_ALPHAVANTAGE_API_KEY", "ALPHAVANTAGE_API_KEY"),
            rapidapi_key: env_or("SENTIBOARD_RAPIDAPI_KEY", "RAPIDAPI_KEY"),
            finnhub_api_key: env_or("SENTIBOARD_FINNHUB_API_KEY", "FINNHUB_API_KEY"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::from("/api"),
            api_token: None,
            use_mock: false,
            state_file: None,
            alphavantage_api_key: None,
            rapidapi_key: None,
            finnhub_api_key: None,
        }
    }
}

/// Single predicate deciding when the mock providers serve a view.
///
/// Consolidates the explicit mock flag and the production flag so
/// every pipeline resolves mock selection identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPolicy {
    forced: bool,
}

impl MockPolicy {
    pub const fn from_flags(use_mock: bool, prod: bool) -> Self {
        Self {
            forced: use_mock || !prod,
        }
    }

    pub const fn forced_mock() -> Self {
        Self { forced: true }
    }

    pub const fn live_first() -> Self {
        Self { forced: false }
    }

    /// When true, pipelines skip the network entirely.
    pub const fn forced(self) -> bool {
        self.forced
    }
}

fn env_or(primary: &str, fallback: &str) -> Option<String> {
    env::var(primary)
        .or_else(|_| env::var(fallback))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_api_without_mock() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "/api");
        assert!(!config.use_mock);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn mock_policy_consolidates_both_signals() {
        assert!(MockPolicy::from_flags(true, true).forced());
        assert!(MockPolicy::from_flags(false, false).forced());
        assert!(!MockPolicy::from_flags(false, true).forced());
    }

    #[test]
    fn truthy_parsing_accepts_common_spellings() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
    }
}
