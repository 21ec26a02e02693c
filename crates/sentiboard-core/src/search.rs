//! Debounced multi-provider symbol lookup.
//!
//! Providers are tried in a fixed order (Alpha Vantage, Yahoo
//! auto-complete, Finnhub); the first one returning at least one
//! usable suggestion wins and failures fall through silently. Rapid
//! callers are debounced on the trailing edge: only the latest query
//! survives the 500 ms window, superseded calls resolve `Cancelled`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::Config;
use crate::domain::SymbolSuggestion;
use crate::error::FetchError;
use crate::gateway::{HttpClient, HttpRequest};

pub const DEBOUNCE: Duration = Duration::from_millis(500);
pub const MAX_SUGGESTIONS: usize = 5;
pub const NO_SUGGESTIONS: &str = "No symbol suggestions available";

const ALPHAVANTAGE_URL: &str = "https://www.alphavantage.co/query";
const YAHOO_HOST: &str = "apidojo-yahoo-finance-v1.p.rapidapi.com";
const FINNHUB_URL: &str = "https://finnhub.io/api/v1/search";

/// API keys for the three providers; a missing key skips the provider.
#[derive(Debug, Clone, Default)]
pub struct SearchKeys {
    pub alphavantage: Option<String>,
    pub rapidapi: Option<String>,
    pub finnhub: Option<String>,
}

impl From<&Config> for SearchKeys {
    fn from(config: &Config) -> Self {
        Self {
            alphavantage: config.alphavantage_api_key.clone(),
            rapidapi: config.rapidapi_key.clone(),
            finnhub: config.finnhub_api_key.clone(),
        }
    }
}

/// Aggregated, debounced symbol search.
pub struct SymbolSearchAggregator {
    client: Arc<dyn HttpClient>,
    keys: SearchKeys,
    debounce: Duration,
    generation: AtomicU64,
}

impl SymbolSearchAggregator {
    pub fn new(client: Arc<dyn HttpClient>, keys: SearchKeys) -> Self {
        Self {
            client,
            keys,
            debounce: DEBOUNCE,
            generation: AtomicU64::new(0),
        }
    }

    /// Zero-debounce variant for deterministic tests.
    pub fn without_debounce(client: Arc<dyn HttpClient>, keys: SearchKeys) -> Self {
        Self {
            client,
            keys,
            debounce: Duration::ZERO,
            generation: AtomicU64::new(0),
        }
    }

    /// Resolve up to [`MAX_SUGGESTIONS`] suggestions for a query.
    ///
    /// Empty or whitespace queries resolve empty without touching the
    /// network. A call superseded by a newer one during the debounce
    /// window resolves `Cancelled`.
    pub async fn suggest(&self, query: &str) -> Result<Vec<SymbolSuggestion>, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
            if self.generation.load(Ordering::SeqCst) != generation {
                return Err(FetchError::cancelled());
            }
        }

        if let Some(found) = self.try_alphavantage(query).await {
            return Ok(found);
        }
        if let Some(found) = self.try_yahoo(query).await {
            return Ok(found);
        }
        if let Some(found) = self.try_finnhub(query).await {
            return Ok(found);
        }

        Err(FetchError::unknown(NO_SUGGESTIONS))
    }

    async fn try_alphavantage(&self, query: &str) -> Option<Vec<SymbolSuggestion>> {
        let key = self.keys.alphavantage.as_deref()?;
        let url = format!(
            "{ALPHAVANTAGE_URL}?function=SYMBOL_SEARCH&keywords={}&apikey={key}",
            urlencoding::encode(query)
        );
        let payload = self
            .issue("alphavantage", HttpRequest::get(url).with_timeout_ms(5_000))
            .await?;

        // Field names carry a numeric prefix ("1. symbol").
        let matches = payload.get("bestMatches")?.as_array()?;
        collect(matches.iter().map(|entry| SymbolSuggestion {
            symbol: text(entry, "1. symbol"),
            name: text(entry, "2. name"),
            region: optional_text(entry, "4. region"),
        }))
    }

    async fn try_yahoo(&self, query: &str) -> Option<Vec<SymbolSuggestion>> {
        let key = self.keys.rapidapi.as_deref()?;
        let url = format!(
            "https://{YAHOO_HOST}/auto-complete?q={}&region=US",
            urlencoding::encode(query)
        );
        let request = HttpRequest::get(url)
            .with_header("x-rapidapi-key", key)
            .with_header("x-rapidapi-host", YAHOO_HOST)
            .with_timeout_ms(5_000);
        let payload = self.issue("yahoo", request).await?;

        let quotes = payload.get("quotes")?.as_array()?;
        collect(quotes.iter().map(|entry| SymbolSuggestion {
            symbol: text(entry, "symbol"),
            name: first_text(entry, &["shortname", "longname", "name"]),
            region: optional_text(entry, "region"),
        }))
    }

    async fn try_finnhub(&self, query: &str) -> Option<Vec<SymbolSuggestion>> {
        let key = self.keys.finnhub.as_deref()?;
        let url = format!(
            "{FINNHUB_URL}?q={}&token={key}",
            urlencoding::encode(query)
        );
        let payload = self
            .issue("finnhub", HttpRequest::get(url).with_timeout_ms(3_000))
            .await?;

        let result = payload.get("result")?.as_array()?;
        collect(result.iter().map(|entry| SymbolSuggestion {
            symbol: text(entry, "symbol"),
            name: text(entry, "description"),
            region: None,
        }))
    }

    /// One provider attempt; any failure logs and falls through.
    async fn issue(&self, provider: &str, request: HttpRequest) -> Option<Value> {
        let deadline = Duration::from_millis(request.timeout_ms);
        let outcome = tokio::time::timeout(deadline, self.client.execute(request)).await;
        match outcome {
            Ok(Ok(response)) if response.is_success() => {
                match serde_json::from_str(&response.body) {
                    Ok(payload) => Some(payload),
                    Err(error) => {
                        log::debug!("search provider {provider} returned invalid JSON: {error}");
                        None
                    }
                }
            }
            Ok(Ok(response)) => {
                log::debug!("search provider {provider} returned status {}", response.status);
                None
            }
            Ok(Err(error)) => {
                log::debug!("search provider {provider} failed: {error}");
                None
            }
            Err(_) => {
                log::debug!("search provider {provider} timed out");
                None
            }
        }
    }
}

impl std::fmt::Debug for SymbolSearchAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolSearchAggregator")
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

/// Keep entries with both a symbol and a display name, cap the list,
/// and treat an empty harvest as a miss so the next provider runs.
fn collect(entries: impl Iterator<Item = SymbolSuggestion>) -> Option<Vec<SymbolSuggestion>> {
    let found: Vec<SymbolSuggestion> = entries
        .filter(|suggestion| !suggestion.symbol.is_empty() && !suggestion.name.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect();
    if found.is_empty() {
        None
    } else {
        Some(found)
    }
}

fn text(entry: &Value, field: &str) -> String {
    entry
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn optional_text(entry: &Value, field: &str) -> Option<String> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn first_text(entry: &Value, fields: &[&str]) -> String {
    fields
        .iter()
        .find_map(|field| optional_text(entry, field))
        .unwrap_or_default()
}
