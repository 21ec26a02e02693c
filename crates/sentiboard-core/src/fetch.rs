//! Per-view fetch orchestration.
//!
//! One pipeline per `RequestKey`: cache-then-network with a 15 minute
//! TTL, single-flight sharing across concurrent callers, cooperative
//! cancellation, and a deterministic fallback ladder (stale cache,
//! then mock) for recoverable failures. State is published through a
//! per-key `watch` channel so every attached caller observes the same
//! resolution.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::config::MockPolicy;
use crate::domain::{Preferences, Symbol, TimeRange, UtcDateTime};
use crate::error::FetchError;
use crate::gateway::{CancelToken, Gateway};
use crate::mock::MockProviders;
use crate::normalize;
use crate::store::{keys, PersistentStore, StoreTier};

/// Advisory banner attached to fallback payloads.
pub const ADVISORY_MOCK: &str = "Live data unavailable — showing mock data";
pub const ADVISORY_CACHED: &str = "Live data unavailable — showing cached data";

/// Cache age ceiling for view payloads.
pub const CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Auto-refresh cadence for the opinion pipeline.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// The dashboard views the orchestrator can fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewEndpoint {
    StockAnalysis,
    StockOpinion,
    SentimentAnalysis,
    AnalyzedNews,
    NewsFeed,
    PredictionHistory,
}

impl ViewEndpoint {
    pub const ALL: [Self; 6] = [
        Self::StockAnalysis,
        Self::StockOpinion,
        Self::SentimentAnalysis,
        Self::AnalyzedNews,
        Self::NewsFeed,
        Self::PredictionHistory,
    ];

    /// API path; `None` means the view is mock-backed only.
    pub const fn path(self) -> Option<&'static str> {
        match self {
            Self::StockAnalysis => Some("/stock-analysis"),
            Self::StockOpinion => Some("/stock-opinion"),
            Self::SentimentAnalysis => Some("/sentiment-analysis"),
            Self::AnalyzedNews => Some("/news/analyzed"),
            Self::NewsFeed => Some("/news/get-news/"),
            Self::PredictionHistory => None,
        }
    }

    /// Per-call deadline; the news primary runs on a short leash.
    pub const fn timeout_ms(self) -> u64 {
        match self {
            Self::AnalyzedNews => 3_000,
            _ => 10_000,
        }
    }

    /// Pipelines that must re-fetch when preferences change.
    pub const fn preference_dependent(self) -> bool {
        matches!(
            self,
            Self::StockAnalysis | Self::StockOpinion | Self::SentimentAnalysis
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::StockAnalysis => "stock-analysis",
            Self::StockOpinion => "stock-opinion",
            Self::SentimentAnalysis => "sentiment-analysis",
            Self::AnalyzedNews => "news-analyzed",
            Self::NewsFeed => "news-feed",
            Self::PredictionHistory => "prediction-history",
        }
    }

    pub fn cache_key(self, symbol: &Symbol) -> String {
        match self {
            Self::StockAnalysis => keys::stock_data(symbol),
            other => format!("{}-{}", other.name(), symbol.as_str()),
        }
    }
}

/// Identity of one fetch: endpoint, symbol, and the canonical query
/// string. Used for single-flight dedup and supersede.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub endpoint: ViewEndpoint,
    pub symbol: Symbol,
    pub params: String,
}

impl RequestKey {
    pub fn new(endpoint: ViewEndpoint, symbol: Symbol, params: impl Into<String>) -> Self {
        Self {
            endpoint,
            symbol,
            params: params.into(),
        }
    }

    /// Canonical key for a view under the given preferences and range.
    pub fn for_view(
        endpoint: ViewEndpoint,
        symbol: &Symbol,
        preferences: &Preferences,
        range: TimeRange,
    ) -> Self {
        let params = match endpoint {
            ViewEndpoint::StockAnalysis => format!(
                "risk_type={}&hold_time={}&detail_level={}",
                preferences.risk.as_str(),
                preferences.hold.wire_value(),
                preferences.detail_level(),
            ),
            ViewEndpoint::StockOpinion => format!(
                "detail_level={}&timeframe={}",
                preferences.detail_level(),
                preferences.hold.wire_value(),
            ),
            ViewEndpoint::SentimentAnalysis => format!("time_range={}", range.as_str()),
            ViewEndpoint::AnalyzedNews
            | ViewEndpoint::NewsFeed
            | ViewEndpoint::PredictionHistory => String::new(),
        };
        Self::new(endpoint, symbol.clone(), params)
    }

    fn query_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = vec![("symbol", self.symbol.as_str())];
        for chunk in self.params.split('&').filter(|chunk| !chunk.is_empty()) {
            if let Some((name, value)) = chunk.split_once('=') {
                pairs.push((name, value));
            }
        }
        pairs
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.endpoint.name(), self.symbol)?;
        if !self.params.is_empty() {
            write!(f, "?{}", self.params)?;
        }
        Ok(())
    }
}

/// Cache read/write behavior for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read fresh entries, write on success.
    #[default]
    Use,
    /// Skip the read, still write on success.
    Refresh,
    /// Neither read nor write.
    Bypass,
}

/// Per-key fetch state machine. `Loading` is the only non-terminal
/// state; a cancelled fetch resolves back to `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    Loading,
    Success {
        payload: Value,
        advisory: Option<String>,
    },
    Stale {
        payload: Value,
        advisory: String,
    },
    Error {
        error: FetchError,
    },
}

impl FetchState {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload, .. } | Self::Stale { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn advisory(&self) -> Option<&str> {
        match self {
            Self::Success { advisory, .. } => advisory.as_deref(),
            Self::Stale { advisory, .. } => Some(advisory),
            _ => None,
        }
    }
}

/// One persisted cache record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: Value,
    pub timestamp: UtcDateTime,
}

impl CacheEntry {
    pub fn fresh(payload: Value) -> Self {
        Self {
            payload,
            timestamp: UtcDateTime::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.timestamp.age() < ttl
    }
}

/// Orchestrates every view fetch. Cheap to share behind an `Arc`.
pub struct FetchOrchestrator {
    store: Arc<PersistentStore>,
    gateway: Arc<Gateway>,
    mock: MockProviders,
    flights: Mutex<HashMap<RequestKey, watch::Receiver<FetchState>>>,
    tokens: Mutex<HashMap<RequestKey, CancelToken>>,
}

impl FetchOrchestrator {
    pub fn new(store: Arc<PersistentStore>, gateway: Arc<Gateway>, mock: MockProviders) -> Self {
        Self {
            store,
            gateway,
            mock,
            flights: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub const fn policy(&self) -> MockPolicy {
        self.mock.policy()
    }

    /// Resolve one key to a terminal state.
    ///
    /// Concurrent calls with the same key attach to the in-flight
    /// resolution instead of issuing a second request. The caller's
    /// token cancels only the flight it started; attached callers are
    /// not interrupted by it.
    pub async fn fetch(
        &self,
        key: RequestKey,
        mode: CacheMode,
        cancel: &CancelToken,
    ) -> FetchState {
        // The lock scope must end before any await point.
        let slot = {
            let mut flights = self
                .flights
                .lock()
                .expect("flight table should not be poisoned");
            match flights.get(&key) {
                Some(existing) => FlightSlot::Attached(existing.clone()),
                None => {
                    let (sender, receiver) = watch::channel(FetchState::Loading);
                    flights.insert(key.clone(), receiver);
                    self.tokens
                        .lock()
                        .expect("token table should not be poisoned")
                        .insert(key.clone(), cancel.clone());
                    FlightSlot::Initiating(sender)
                }
            }
        };

        match slot {
            FlightSlot::Attached(receiver) => Self::attach(receiver).await,
            FlightSlot::Initiating(sender) => {
                // The guard clears the tables even when this future is
                // dropped mid-flight, so the key never wedges in the
                // `Loading` state.
                let _guard = FlightGuard {
                    orchestrator: self,
                    key: &key,
                };
                let state = self.run_flight(&key, mode, cancel).await;
                let _ = sender.send(state.clone());
                state
            }
        }
    }

    /// Observe the in-flight state for a key, if any.
    pub fn in_flight(&self, key: &RequestKey) -> bool {
        self.flights
            .lock()
            .expect("flight table should not be poisoned")
            .contains_key(key)
    }

    /// Cancel and forget every in-flight fetch for a symbol. Attached
    /// observers resolve to `Idle`; nothing is surfaced as an error.
    pub fn supersede(&self, symbol: &Symbol) {
        self.supersede_matching(|key| &key.symbol == symbol);
    }

    /// Cancel the in-flight fetches whose key matches the predicate.
    pub fn supersede_matching(&self, matches: impl Fn(&RequestKey) -> bool) {
        let tokens = self
            .tokens
            .lock()
            .expect("token table should not be poisoned");
        for (key, token) in tokens.iter() {
            if matches(key) {
                log::debug!("superseding {key}");
                token.cancel();
            }
        }
    }

    /// Explicit retry: cancel any in-flight fetch for the key and
    /// re-enter the pipeline, skipping the cache read.
    pub async fn retry(&self, key: RequestKey, cancel: &CancelToken) -> FetchState {
        {
            let tokens = self
                .tokens
                .lock()
                .expect("token table should not be poisoned");
            if let Some(token) = tokens.get(&key) {
                token.cancel();
            }
        }
        // Wait for the superseded flight to unwind before re-entering.
        loop {
            let receiver = {
                let flights = self
                    .flights
                    .lock()
                    .expect("flight table should not be poisoned");
                flights.get(&key).cloned()
            };
            match receiver {
                Some(receiver) => {
                    Self::attach(receiver).await;
                }
                None => break,
            }
        }
        self.fetch(key, CacheMode::Refresh, cancel).await
    }

    /// Start the 5 minute auto-refresh loop for a key. A tick is
    /// skipped while a fetch for the key is already in flight.
    pub fn spawn_auto_refresh(self: Arc<Self>, key: RequestKey) -> RefreshHandle {
        self.spawn_auto_refresh_every(REFRESH_INTERVAL, key)
    }

    /// Auto-refresh loop on an explicit cadence.
    pub fn spawn_auto_refresh_every(
        self: Arc<Self>,
        period: Duration,
        key: RequestKey,
    ) -> RefreshHandle {
        let handle = RefreshHandle::new();
        let paused = Arc::clone(&handle.paused);
        let stop = handle.stop.clone();
        let orchestrator = self;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if paused.load(Ordering::SeqCst) || orchestrator.in_flight(&key) {
                            continue;
                        }
                        let token = CancelToken::new();
                        let _ = orchestrator
                            .fetch(key.clone(), CacheMode::Refresh, &token)
                            .await;
                    }
                    _ = stop.cancelled() => break,
                }
            }
        });

        handle
    }

    async fn attach(mut receiver: watch::Receiver<FetchState>) -> FetchState {
        loop {
            let state = receiver.borrow_and_update().clone();
            if state.is_terminal() {
                return state;
            }
            if receiver.changed().await.is_err() {
                // The initiator vanished without publishing a terminal
                // state; treat the flight as cancelled.
                let state = receiver.borrow().clone();
                return if state.is_terminal() {
                    state
                } else {
                    FetchState::Idle
                };
            }
        }
    }

    fn remove_flight(&self, key: &RequestKey) {
        self.flights
            .lock()
            .expect("flight table should not be poisoned")
            .remove(key);
        self.tokens
            .lock()
            .expect("token table should not be poisoned")
            .remove(key);
    }

    async fn run_flight(
        &self,
        key: &RequestKey,
        mode: CacheMode,
        cancel: &CancelToken,
    ) -> FetchState {
        if self.policy().forced() || key.endpoint.path().is_none() {
            return self.serve_mock(key, cancel, None).await;
        }

        let cache_key = key.endpoint.cache_key(&key.symbol);
        let cached = match mode {
            CacheMode::Bypass => None,
            _ => self.read_cache(&cache_key),
        };
        if mode == CacheMode::Use {
            if let Some(entry) = &cached {
                if entry.is_fresh(CACHE_TTL) {
                    log::debug!("{key}: cache hit, skipping network");
                    return FetchState::Success {
                        payload: entry.payload.clone(),
                        advisory: None,
                    };
                }
            }
        }

        let path = match key.endpoint.path() {
            Some(path) => path,
            None => return self.serve_mock(key, cancel, None).await,
        };
        let outcome = self
            .gateway
            .get(path, &key.query_pairs(), key.endpoint.timeout_ms(), cancel)
            .await
            .and_then(|raw| normalize::normalize_for(key.endpoint, raw));

        match outcome {
            Ok(payload) => {
                if mode != CacheMode::Bypass {
                    self.write_cache(&cache_key, &payload);
                }
                FetchState::Success {
                    payload,
                    advisory: None,
                }
            }
            Err(error) if error.is_cancelled() => FetchState::Idle,
            Err(error) if error.recoverable() => {
                log::warn!("{key}: {error}, falling back");
                if let Some(entry) = cached {
                    return FetchState::Stale {
                        payload: entry.payload,
                        advisory: String::from(ADVISORY_CACHED),
                    };
                }
                self.serve_mock(key, cancel, Some(String::from(ADVISORY_MOCK)))
                    .await
            }
            Err(error) => {
                log::warn!("{key}: {error}");
                FetchState::Error { error }
            }
        }
    }

    async fn serve_mock(
        &self,
        key: &RequestKey,
        cancel: &CancelToken,
        advisory: Option<String>,
    ) -> FetchState {
        let raw = tokio::select! {
            raw = self.mock.generate(key.endpoint, &key.symbol, &key.params) => raw,
            _ = cancel.cancelled() => return FetchState::Idle,
        };
        match normalize::normalize_for(key.endpoint, raw) {
            Ok(payload) => FetchState::Success { payload, advisory },
            Err(error) => FetchState::Error { error },
        }
    }

    fn read_cache(&self, cache_key: &str) -> Option<CacheEntry> {
        let value = self.store.get(StoreTier::Durable, cache_key)?;
        match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(error) => {
                log::warn!("discarding unreadable cache entry {cache_key}: {error}");
                None
            }
        }
    }

    fn write_cache(&self, cache_key: &str, payload: &Value) {
        match serde_json::to_value(CacheEntry::fresh(payload.clone())) {
            Ok(value) => self.store.set(StoreTier::Durable, cache_key, value),
            Err(error) => log::warn!("cache entry {cache_key} failed to encode: {error}"),
        }
    }
}

/// Outcome of the flight-table lookup for one `fetch` call.
enum FlightSlot {
    Attached(watch::Receiver<FetchState>),
    Initiating(watch::Sender<FetchState>),
}

/// Removes the flight entry when the initiating future ends, normally
/// or by being dropped mid-flight.
struct FlightGuard<'a> {
    orchestrator: &'a FetchOrchestrator,
    key: &'a RequestKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.remove_flight(self.key);
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("policy", &self.policy())
            .finish_non_exhaustive()
    }
}

/// Control handle for an auto-refresh loop.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    paused: Arc<AtomicBool>,
    stop: CancelToken,
}

impl RefreshHandle {
    fn new() -> Self {
        Self {
            paused: Arc::new(AtomicBool::new(false)),
            stop: CancelToken::new(),
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }
}
