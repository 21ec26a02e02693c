//! Core data layer for sentiboard.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Persistent two-tier key/value store
//! - HTTP gateway with cancellation and normalized errors
//! - Per-view fetch orchestration (cache, single-flight, fallback)
//! - Payload normalization and derived fields
//! - Debounced multi-provider symbol search
//! - View-state coordination (selection, preferences gate)

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod mock;
pub mod mutations;
pub mod normalize;
pub mod search;
pub mod store;

pub use config::{Config, MockPolicy};
pub use coordinator::{PreferencesGate, Selection, ViewStateCoordinator};
pub use domain::{
    ActiveTab, HoldTime, NewsArticle, NewsDigest, Preferences, PredictionHistory,
    PredictionOutcome, PriceFeatures, PricePrediction, RiskLevel, SentimentSeries, StockAnalysis,
    StockOpinion, Symbol, SymbolSuggestion, TimeRange, UtcDateTime,
};
pub use error::{CoreError, FetchError, FetchErrorKind, ValidationError};
pub use fetch::{
    CacheEntry, CacheMode, FetchOrchestrator, FetchState, RefreshHandle, RequestKey, ViewEndpoint,
    ADVISORY_CACHED, ADVISORY_MOCK, CACHE_TTL, REFRESH_INTERVAL,
};
pub use gateway::{
    CancelToken, Gateway, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};
pub use mock::MockProviders;
pub use mutations::Mutations;
pub use search::{SearchKeys, SymbolSearchAggregator, MAX_SUGGESTIONS};
pub use store::{PersistentStore, StoreTier};
