pub mod models;
pub mod preferences;
pub mod symbol;
pub mod timestamp;

pub use models::{
    Impact, KeyFactor, NewsArticle, NewsDigest, OpinionSummary, PredictionHistory,
    PredictionOutcome, PredictionRecord, PriceFeatures, PricePrediction, PriceTargets,
    Recommendation,
    RiskAssessment, RsiStatus, SentimentDirection, SentimentDistribution, SentimentLabel,
    SentimentPoint, SentimentSeries, SentimentTone, SourceStats, StockAnalysis, StockOpinion,
    SymbolSuggestion, Technicals, TrendDirection,
};
pub use preferences::{ActiveTab, HoldTime, Preferences, RiskLevel, TimeRange};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
