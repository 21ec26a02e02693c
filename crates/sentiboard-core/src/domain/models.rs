//! Normalized view payloads.
//!
//! Every struct here is the post-normalizer shape: optional upstream
//! fields are already filled with typed defaults, numeric fields are
//! clamped into their documented ranges, and derived fields (sentiment
//! percentage, RSI status, trend direction) are populated. Views never
//! branch on absent data.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::preferences::RiskLevel;
use super::symbol::Symbol;
use super::timestamp::UtcDateTime;

/// Analyst action after normalization; unknown values map to `Hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    #[default]
    Hold,
}

/// Per-article sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTone {
    Positive,
    #[default]
    Neutral,
    Negative,
}

/// Direction derived from the signed sentiment score with a ±0.05
/// deadband around zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentDirection {
    Up,
    Down,
    Neutral,
}

/// Five-band label over the sentiment percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    #[serde(rename = "Strong Negative")]
    StrongNegative,
    #[serde(rename = "Moderately Negative")]
    ModeratelyNegative,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Moderately Positive")]
    ModeratelyPositive,
    #[serde(rename = "Strong Positive")]
    StrongPositive,
}

impl Display for SentimentLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::StrongNegative => "Strong Negative",
            Self::ModeratelyNegative => "Moderately Negative",
            Self::Neutral => "Neutral",
            Self::ModeratelyPositive => "Moderately Positive",
            Self::StrongPositive => "Strong Positive",
        };
        f.write_str(text)
    }
}

/// RSI reading bucketed at the conventional 30/70 thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiStatus {
    Overbought,
    Oversold,
    Neutral,
}

/// Moving-average crossover direction (SMA 50 vs SMA 200).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increase,
    Decrease,
}

/// Impact classification for a key analysis factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// Technical indicator block. Invariant: `support <= pivot <=
/// resistance` and `rsi` in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technicals {
    pub current_price: f64,
    pub rsi: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub support: f64,
    pub resistance: f64,
    pub pivot: f64,
    pub volume: u64,
}

/// Price target block. Invariant: `bearish <= base <= bullish`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargets {
    pub base: f64,
    pub bullish: f64,
    pub bearish: f64,
    pub consensus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFactor {
    pub title: String,
    pub description: String,
    pub impact: Impact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub description: String,
}

/// Fully normalized stock analysis, the payload behind the opinion
/// view. Derived fields are computed by the normalizer and always
/// consistent with the raw scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAnalysis {
    pub company: String,
    pub symbol: Symbol,
    pub last_updated: UtcDateTime,
    pub recommendation: Recommendation,
    /// Clamped to [0, 1].
    pub confidence: f64,
    /// Clamped to [-1, 1].
    pub sentiment: f64,
    pub technicals: Technicals,
    pub price_targets: PriceTargets,
    pub key_factors: Vec<KeyFactor>,
    pub risk_assessment: RiskAssessment,
    pub sentiment_percentage: f64,
    pub sentiment_direction: SentimentDirection,
    pub sentiment_label: SentimentLabel,
    pub rsi_status: RsiStatus,
    pub trend_direction: TrendDirection,
    /// Expected price-change magnitude in percent, capped at 4.
    pub price_change_pct: f64,
}

/// Short-form opinion returned by the `/stock-opinion` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionSummary {
    pub action: Recommendation,
    pub confidence: f64,
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOpinion {
    pub symbol: Symbol,
    pub technical: Technicals,
    pub opinion: OpinionSummary,
    pub factors: Vec<KeyFactor>,
}

/// Normalized, sentiment-annotated news article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    /// Reliability score in [0, 100]; unknown sources default to 70.
    pub source_reliability: f64,
    pub published_at: UtcDateTime,
    pub sentiment: SentimentTone,
    /// Clamped to [0, 1].
    pub confidence: f64,
    pub key_phrases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_image_url: Option<String>,
}

/// Normalized news list plus the aggregates the news view header
/// renders alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsDigest {
    pub articles: Vec<NewsArticle>,
    /// Confidence-weighted mean tone in [-1, 1].
    pub sentiment: f64,
    /// Aggregate confidence in [0, 100].
    pub confidence: f64,
}

/// One point of the sentiment time series, ordered by date ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: String,
    pub score: f64,
}

/// Percentage split; the normalizer rescales so the sum is 100 ± 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentDistribution {
    pub fn total(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SourceStats {
    pub tier1_count: u32,
    pub tier1_sources: Vec<String>,
    pub reliability_sum: f64,
    pub news_count: u32,
}

/// Aggregated sentiment history for the sentiment view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSeries {
    pub symbol: Symbol,
    /// Overall signed score in [-1, 1].
    pub sentiment: f64,
    pub news_count: u32,
    pub points: Vec<SentimentPoint>,
    pub distribution: SentimentDistribution,
    pub source_stats: SourceStats,
}

/// Symbol-search hit; lists are capped at five entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSuggestion {
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// One row of the prediction-history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub date: String,
    pub predicted: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionHistory {
    pub symbol: Symbol,
    pub records: Vec<PredictionRecord>,
}

/// Result of the news-text predictor mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub prediction: String,
    pub confidence: f64,
}

/// Result of the feature-vector price predictor mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    pub prediction: f64,
}

/// Feature vector for the price predictor, in upstream order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceFeatures {
    pub open: f64,
    pub close: f64,
    pub volume: f64,
    pub sentiment: f64,
}

impl PriceFeatures {
    pub fn as_vec(&self) -> Vec<f64> {
        vec![self.open, self.close, self.volume, self.sentiment]
    }
}
