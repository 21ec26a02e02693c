//! Upstream payload validation, default filling, and derivation.
//!
//! Raw payloads arrive in two spellings (snake_case and camelCase) and
//! with optional blocks missing. The normalizer deserializes into
//! lenient raw shapes, fills typed defaults, clamps numeric ranges, and
//! derives the secondary fields downstream views read. Payloads missing
//! their discriminator fields are rejected with a `Parse` error; the
//! views treat that as fatal.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{
    Impact, KeyFactor, NewsArticle, NewsDigest, OpinionSummary, PredictionHistory,
    PredictionRecord, PriceTargets, Recommendation, RiskAssessment, RiskLevel, RsiStatus,
    SentimentDirection,
    SentimentDistribution, SentimentLabel, SentimentPoint, SentimentSeries, SentimentTone,
    SourceStats, StockAnalysis, StockOpinion, Symbol, Technicals, TrendDirection, UtcDateTime,
};
use crate::error::FetchError;
use crate::fetch::ViewEndpoint;

/// Reliability scores for known publications; unknown sources get 70.
const SOURCE_RELIABILITY: [(&str, f64); 4] = [
    ("bloomberg", 95.0),
    ("financial times", 90.0),
    ("reuters", 85.0),
    ("yahoo finance", 80.0),
];

pub const DEFAULT_RELIABILITY: f64 = 70.0;
const TIER1_THRESHOLD: f64 = 85.0;

pub fn source_reliability(source: &str) -> f64 {
    let lowered = source.trim().to_ascii_lowercase();
    SOURCE_RELIABILITY
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, score)| *score)
        .unwrap_or(DEFAULT_RELIABILITY)
}

/// Normalize one endpoint's raw payload into its stable view shape.
pub fn normalize_for(endpoint: ViewEndpoint, raw: Value) -> Result<Value, FetchError> {
    let normalized = match endpoint {
        ViewEndpoint::StockAnalysis => to_value(stock_analysis(raw)?),
        ViewEndpoint::StockOpinion => to_value(stock_opinion(raw)?),
        ViewEndpoint::SentimentAnalysis => to_value(sentiment_series(raw)?),
        ViewEndpoint::AnalyzedNews | ViewEndpoint::NewsFeed => to_value(news_digest(raw)?),
        ViewEndpoint::PredictionHistory => to_value(prediction_history(raw)?),
    };
    normalized
}

fn to_value<T: serde::Serialize>(payload: T) -> Result<Value, FetchError> {
    serde_json::to_value(payload)
        .map_err(|e| FetchError::unknown(format!("normalized payload failed to serialize: {e}")))
}

// Derivation formulas shared by the analysis and sentiment views.

pub fn sentiment_percentage(sentiment: f64) -> f64 {
    ((sentiment + 1.0) / 2.0) * 100.0
}

/// ±0.05 deadband around zero.
pub fn sentiment_direction(sentiment: f64) -> SentimentDirection {
    if sentiment > 0.05 {
        SentimentDirection::Up
    } else if sentiment < -0.05 {
        SentimentDirection::Down
    } else {
        SentimentDirection::Neutral
    }
}

pub fn sentiment_label(percentage: f64) -> SentimentLabel {
    if percentage < 25.0 {
        SentimentLabel::StrongNegative
    } else if percentage < 40.0 {
        SentimentLabel::ModeratelyNegative
    } else if percentage < 60.0 {
        SentimentLabel::Neutral
    } else if percentage < 75.0 {
        SentimentLabel::ModeratelyPositive
    } else {
        SentimentLabel::StrongPositive
    }
}

pub fn rsi_status(rsi: f64) -> RsiStatus {
    if rsi > 70.0 {
        RsiStatus::Overbought
    } else if rsi < 30.0 {
        RsiStatus::Oversold
    } else {
        RsiStatus::Neutral
    }
}

pub fn trend_direction(sma50: f64, sma200: f64) -> TrendDirection {
    if sma50 > sma200 {
        TrendDirection::Increase
    } else {
        TrendDirection::Decrease
    }
}

/// Expected move magnitude in percent, capped at 4.
pub fn price_change_pct(sentiment: f64) -> f64 {
    (sentiment.abs() * 4.0).min(4.0)
}

/// Confidence for a set of annotated articles: sentiment strength
/// blended with average source reliability (65/35).
pub fn news_aggregate_confidence(sentiment: f64, articles: &[NewsArticle]) -> f64 {
    let avg_reliability = if articles.is_empty() {
        DEFAULT_RELIABILITY
    } else {
        articles
            .iter()
            .map(|article| article.source_reliability)
            .sum::<f64>()
            / articles.len() as f64
    };
    0.65 * (sentiment.abs() * 100.0).min(95.0) + 0.35 * avg_reliability
}

// Raw (pre-normalization) shapes.

#[derive(Debug, Deserialize)]
struct RawTechnicals {
    #[serde(alias = "currentPrice", alias = "price")]
    current_price: Option<f64>,
    rsi: Option<f64>,
    #[serde(alias = "sma_50")]
    sma50: Option<f64>,
    #[serde(alias = "sma_200")]
    sma200: Option<f64>,
    support: Option<f64>,
    resistance: Option<f64>,
    pivot: Option<f64>,
    volume: Option<f64>,
}

impl RawTechnicals {
    fn fill(self) -> Result<Technicals, FetchError> {
        let price = self
            .current_price
            .ok_or_else(|| FetchError::parse("technicals missing current price"))?;

        let support = self.support.unwrap_or(price * 0.95);
        let resistance = self.resistance.unwrap_or(price * 1.05);
        let (support, resistance) = if support <= resistance {
            (support, resistance)
        } else {
            (resistance, support)
        };

        Ok(Technicals {
            current_price: price,
            rsi: self.rsi.unwrap_or(50.0).clamp(0.0, 100.0),
            sma50: self.sma50.unwrap_or(price * 0.99),
            sma200: self.sma200.unwrap_or(price * 0.97),
            support,
            resistance,
            pivot: self.pivot.unwrap_or(price).clamp(support, resistance),
            volume: self.volume.unwrap_or(0.0).max(0.0) as u64,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawPriceTargets {
    base: Option<f64>,
    bullish: Option<f64>,
    bearish: Option<f64>,
    consensus: Option<f64>,
}

impl RawPriceTargets {
    fn fill(self, price: f64) -> PriceTargets {
        let bearish = self.bearish.unwrap_or(price * 0.85);
        let bullish = self.bullish.unwrap_or(price * 1.15);
        let (bearish, bullish) = if bearish <= bullish {
            (bearish, bullish)
        } else {
            (bullish, bearish)
        };
        let base = self.base.unwrap_or(price).clamp(bearish, bullish);

        PriceTargets {
            base,
            bullish,
            bearish,
            consensus: self.consensus.unwrap_or(base),
        }
    }

    fn missing() -> Self {
        Self {
            base: None,
            bullish: None,
            bearish: None,
            consensus: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawKeyFactor {
    title: Option<String>,
    description: Option<String>,
    impact: Option<String>,
}

impl RawKeyFactor {
    fn fill(self) -> Option<KeyFactor> {
        let title = self.title.filter(|title| !title.trim().is_empty())?;
        Some(KeyFactor {
            title,
            description: self.description.unwrap_or_default(),
            impact: match self.impact.as_deref().map(str::to_ascii_lowercase) {
                Some(ref value) if value == "positive" => Impact::Positive,
                Some(ref value) if value == "negative" => Impact::Negative,
                _ => Impact::Neutral,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawRiskAssessment {
    level: Option<String>,
    description: Option<String>,
}

impl RawRiskAssessment {
    fn fill(self) -> RiskAssessment {
        RiskAssessment {
            level: self
                .level
                .as_deref()
                .and_then(|value| RiskLevel::parse(value).ok())
                .unwrap_or(RiskLevel::Medium),
            description: self.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawStockAnalysis {
    company: Option<String>,
    symbol: Option<String>,
    #[serde(alias = "lastUpdated")]
    last_updated: Option<Value>,
    recommendation: Option<String>,
    confidence: Option<f64>,
    sentiment: Option<f64>,
    technicals: Option<RawTechnicals>,
    #[serde(alias = "priceTargets")]
    price_targets: Option<RawPriceTargets>,
    #[serde(alias = "keyFactors", default)]
    key_factors: Vec<RawKeyFactor>,
    #[serde(alias = "riskAssessment")]
    risk_assessment: Option<RawRiskAssessment>,
}

/// Normalize a `/stock-analysis` payload.
pub fn stock_analysis(raw: Value) -> Result<StockAnalysis, FetchError> {
    let raw: RawStockAnalysis = from_value(raw)?;
    let symbol = required_symbol(raw.symbol.as_deref())?;
    let technicals = raw
        .technicals
        .ok_or_else(|| FetchError::parse("stock analysis missing technicals"))?
        .fill()?;

    let sentiment = raw.sentiment.unwrap_or(0.0).clamp(-1.0, 1.0);
    let percentage = sentiment_percentage(sentiment);
    let price = technicals.current_price;

    Ok(StockAnalysis {
        company: raw
            .company
            .unwrap_or_else(|| symbol.as_str().to_owned()),
        symbol,
        last_updated: raw
            .last_updated
            .as_ref()
            .and_then(UtcDateTime::parse_lenient)
            .unwrap_or_else(UtcDateTime::now),
        recommendation: parse_recommendation(raw.recommendation.as_deref()),
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        sentiment,
        price_targets: raw
            .price_targets
            .unwrap_or_else(RawPriceTargets::missing)
            .fill(price),
        key_factors: raw
            .key_factors
            .into_iter()
            .filter_map(RawKeyFactor::fill)
            .collect(),
        risk_assessment: raw
            .risk_assessment
            .unwrap_or(RawRiskAssessment {
                level: None,
                description: None,
            })
            .fill(),
        sentiment_percentage: percentage,
        sentiment_direction: sentiment_direction(sentiment),
        sentiment_label: sentiment_label(percentage),
        rsi_status: rsi_status(technicals.rsi),
        trend_direction: trend_direction(technicals.sma50, technicals.sma200),
        price_change_pct: price_change_pct(sentiment),
        technicals,
    })
}

#[derive(Debug, Deserialize)]
struct RawOpinion {
    action: Option<String>,
    #[serde(alias = "recommendation")]
    opinion: Option<String>,
    confidence: Option<f64>,
    #[serde(default)]
    rationale: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawStockOpinion {
    symbol: Option<String>,
    technical: Option<RawTechnicals>,
    opinion: Option<RawOpinion>,
    #[serde(default)]
    factors: Vec<RawKeyFactor>,
}

/// Normalize a `/stock-opinion` payload.
pub fn stock_opinion(raw: Value) -> Result<StockOpinion, FetchError> {
    let raw: RawStockOpinion = from_value(raw)?;
    let symbol = required_symbol(raw.symbol.as_deref())?;
    let technical = raw
        .technical
        .ok_or_else(|| FetchError::parse("stock opinion missing technical block"))?
        .fill()?;
    let opinion = raw
        .opinion
        .ok_or_else(|| FetchError::parse("stock opinion missing opinion block"))?;

    Ok(StockOpinion {
        symbol,
        technical,
        opinion: OpinionSummary {
            action: parse_recommendation(
                opinion.action.as_deref().or(opinion.opinion.as_deref()),
            ),
            confidence: opinion.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            rationale: opinion.rationale,
        },
        factors: raw
            .factors
            .into_iter()
            .filter_map(RawKeyFactor::fill)
            .collect(),
    })
}

#[derive(Debug, Deserialize)]
struct RawSentimentPoint {
    date: Option<String>,
    #[serde(alias = "sentiment", alias = "value")]
    score: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawDistribution {
    positive: Option<f64>,
    neutral: Option<f64>,
    negative: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawSourceStats {
    #[serde(alias = "tier1Count")]
    tier1_count: Option<u32>,
    #[serde(alias = "tier1Sources", default)]
    tier1_sources: Vec<String>,
    #[serde(alias = "reliabilitySum")]
    reliability_sum: Option<f64>,
    #[serde(alias = "newsCount")]
    news_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawSentimentSeries {
    symbol: Option<String>,
    sentiment: Option<f64>,
    #[serde(alias = "newsCount")]
    news_count: Option<u32>,
    #[serde(default)]
    points: Vec<RawSentimentPoint>,
    distribution: Option<RawDistribution>,
    #[serde(alias = "sourceStats")]
    source_stats: Option<RawSourceStats>,
}

/// Normalize a `/sentiment-analysis` payload. Points keep upstream
/// order; the distribution is rescaled so percentages sum to 100.
pub fn sentiment_series(raw: Value) -> Result<SentimentSeries, FetchError> {
    let raw: RawSentimentSeries = from_value(raw)?;
    let symbol = required_symbol(raw.symbol.as_deref())?;
    let sentiment = raw.sentiment.unwrap_or(0.0).clamp(-1.0, 1.0);

    let points: Vec<SentimentPoint> = raw
        .points
        .into_iter()
        .filter_map(|point| {
            let date = point.date.filter(|date| !date.trim().is_empty())?;
            Some(SentimentPoint {
                date,
                score: point.score.unwrap_or(0.0).clamp(-1.0, 1.0),
            })
        })
        .collect();

    let raw_distribution = raw.distribution.unwrap_or_default();
    let positive = raw_distribution.positive.unwrap_or(0.0).max(0.0);
    let neutral = raw_distribution.neutral.unwrap_or(0.0).max(0.0);
    let negative = raw_distribution.negative.unwrap_or(0.0).max(0.0);
    let total = positive + neutral + negative;
    let distribution = if total > 0.0 {
        SentimentDistribution {
            positive: positive / total * 100.0,
            neutral: neutral / total * 100.0,
            negative: negative / total * 100.0,
        }
    } else {
        SentimentDistribution {
            positive: 0.0,
            neutral: 100.0,
            negative: 0.0,
        }
    };

    let stats = raw.source_stats.unwrap_or_default();
    let news_count = raw.news_count.or(stats.news_count).unwrap_or(0);

    Ok(SentimentSeries {
        symbol,
        sentiment,
        news_count,
        points,
        distribution,
        source_stats: SourceStats {
            tier1_count: stats
                .tier1_count
                .unwrap_or(stats.tier1_sources.len() as u32),
            tier1_sources: stats.tier1_sources,
            reliability_sum: stats.reliability_sum.unwrap_or(0.0),
            news_count: stats.news_count.unwrap_or(news_count),
        },
    })
}

/// `keyPhrases` arrives either as a sequence or a comma string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawKeyPhrases {
    List(Vec<String>),
    Joined(String),
}

impl RawKeyPhrases {
    fn into_list(self) -> Vec<String> {
        match self {
            Self::List(phrases) => phrases
                .into_iter()
                .map(|phrase| phrase.trim().to_owned())
                .filter(|phrase| !phrase.is_empty())
                .collect(),
            Self::Joined(joined) => joined
                .split(',')
                .map(|phrase| phrase.trim().to_owned())
                .filter(|phrase| !phrase.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNewsArticle {
    url: Option<String>,
    title: Option<String>,
    #[serde(alias = "description")]
    summary: Option<String>,
    source: Option<String>,
    #[serde(alias = "sourceReliability", alias = "reliability")]
    source_reliability: Option<f64>,
    #[serde(
        alias = "publishedAt",
        alias = "time_published",
        alias = "datetime"
    )]
    published_at: Option<Value>,
    sentiment: Option<Value>,
    confidence: Option<f64>,
    #[serde(alias = "keyPhrases")]
    key_phrases: Option<RawKeyPhrases>,
    #[serde(alias = "bannerImageUrl", alias = "banner_image")]
    banner_image_url: Option<String>,
}

impl RawNewsArticle {
    fn fill(self) -> Option<NewsArticle> {
        let title = self.title.filter(|title| !title.trim().is_empty())?;
        let source = self.source.unwrap_or_default();
        let reliability = self
            .source_reliability
            .unwrap_or_else(|| source_reliability(&source))
            .clamp(0.0, 100.0);

        Some(NewsArticle {
            url: self.url.unwrap_or_default(),
            title,
            summary: self.summary.unwrap_or_default(),
            source,
            source_reliability: reliability,
            published_at: self
                .published_at
                .as_ref()
                .and_then(UtcDateTime::parse_lenient)
                .unwrap_or_else(UtcDateTime::now),
            sentiment: parse_tone(self.sentiment.as_ref()),
            confidence: self.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            key_phrases: self
                .key_phrases
                .map(RawKeyPhrases::into_list)
                .unwrap_or_default(),
            banner_image_url: self
                .banner_image_url
                .filter(|url| !url.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNewsPayload {
    Bare(Vec<RawNewsArticle>),
    Enveloped { news: Vec<RawNewsArticle> },
}

/// Normalize a news payload; both the bare-list and `{news: [...]}`
/// shapes appear upstream. Articles without a title are dropped.
pub fn news_articles(raw: Value) -> Result<Vec<NewsArticle>, FetchError> {
    let raw: RawNewsPayload = from_value(raw)?;
    let items = match raw {
        RawNewsPayload::Bare(items) => items,
        RawNewsPayload::Enveloped { news } => news,
    };
    Ok(items.into_iter().filter_map(RawNewsArticle::fill).collect())
}

/// Normalize a news payload into the digest the news view renders:
/// the article list plus the derived aggregates.
pub fn news_digest(raw: Value) -> Result<NewsDigest, FetchError> {
    let articles = news_articles(raw)?;
    let sentiment = news_overall_sentiment(&articles);
    let confidence = news_aggregate_confidence(sentiment, &articles);
    Ok(NewsDigest {
        articles,
        sentiment,
        confidence,
    })
}

/// Confidence-weighted mean of the article tones.
pub fn news_overall_sentiment(articles: &[NewsArticle]) -> f64 {
    if articles.is_empty() {
        return 0.0;
    }
    let signed: f64 = articles
        .iter()
        .map(|article| {
            let tone = match article.sentiment {
                SentimentTone::Positive => 1.0,
                SentimentTone::Neutral => 0.0,
                SentimentTone::Negative => -1.0,
            };
            tone * article.confidence
        })
        .sum();
    (signed / articles.len() as f64).clamp(-1.0, 1.0)
}

#[derive(Debug, Deserialize)]
struct RawPredictionRecord {
    date: Option<String>,
    #[serde(alias = "prediction")]
    predicted: Option<f64>,
    actual: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPredictionHistory {
    symbol: Option<String>,
    #[serde(default)]
    records: Vec<RawPredictionRecord>,
}

pub fn prediction_history(raw: Value) -> Result<PredictionHistory, FetchError> {
    let raw: RawPredictionHistory = from_value(raw)?;
    let symbol = required_symbol(raw.symbol.as_deref())?;

    Ok(PredictionHistory {
        symbol,
        records: raw
            .records
            .into_iter()
            .filter_map(|record| {
                let date = record.date.filter(|date| !date.trim().is_empty())?;
                let predicted = record.predicted?;
                Some(PredictionRecord {
                    date,
                    predicted,
                    actual: record.actual,
                })
            })
            .collect(),
    })
}

fn from_value<T: serde::de::DeserializeOwned>(raw: Value) -> Result<T, FetchError> {
    serde_json::from_value(raw).map_err(|e| FetchError::parse(format!("malformed payload: {e}")))
}

fn required_symbol(symbol: Option<&str>) -> Result<Symbol, FetchError> {
    let text = symbol.ok_or_else(|| FetchError::parse("payload missing symbol"))?;
    Symbol::parse(text).map_err(|e| FetchError::parse(format!("payload symbol invalid: {e}")))
}

fn parse_recommendation(raw: Option<&str>) -> Recommendation {
    match raw.map(str::to_ascii_uppercase).as_deref() {
        Some("BUY") => Recommendation::Buy,
        Some("SELL") => Recommendation::Sell,
        _ => Recommendation::Hold,
    }
}

/// Tone comes as a label ("positive", "Bullish") or a signed score.
fn parse_tone(raw: Option<&Value>) -> SentimentTone {
    match raw {
        Some(Value::String(label)) => {
            let lowered = label.to_ascii_lowercase();
            if lowered.contains("positive") || lowered.contains("bull") {
                SentimentTone::Positive
            } else if lowered.contains("negative") || lowered.contains("bear") {
                SentimentTone::Negative
            } else {
                SentimentTone::Neutral
            }
        }
        Some(Value::Number(number)) => {
            let score = number.as_f64().unwrap_or(0.0);
            if score > 0.05 {
                SentimentTone::Positive
            } else if score < -0.05 {
                SentimentTone::Negative
            } else {
                SentimentTone::Neutral
            }
        }
        _ => SentimentTone::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use serde_json::json;

    #[test]
    fn analysis_fills_targets_and_derives_fields() {
        let analysis = stock_analysis(json!({
            "symbol": "IBM",
            "sentiment": 0.4,
            "technicals": { "currentPrice": 100.0, "rsi": 82.0 },
        }))
        .expect("normalizes");

        assert_eq!(analysis.price_targets.bearish, 85.0);
        assert_eq!(analysis.price_targets.base, 100.0);
        assert_eq!(analysis.price_targets.bullish, 115.0);
        assert_eq!(analysis.technicals.support, 95.0);
        assert_eq!(analysis.technicals.resistance, 105.0);
        assert_eq!(analysis.technicals.sma50, 99.0);
        assert_eq!(analysis.technicals.sma200, 97.0);

        assert_eq!(analysis.sentiment_percentage, 70.0);
        assert_eq!(analysis.sentiment_direction, SentimentDirection::Up);
        assert_eq!(analysis.sentiment_label, SentimentLabel::ModeratelyPositive);
        assert_eq!(analysis.rsi_status, RsiStatus::Overbought);
        assert_eq!(analysis.trend_direction, TrendDirection::Increase);
        assert!((analysis.price_change_pct - 1.6).abs() < 1e-9);
        assert_eq!(analysis.recommendation, Recommendation::Hold);
    }

    #[test]
    fn analysis_clamps_out_of_range_scores() {
        let analysis = stock_analysis(json!({
            "symbol": "IBM",
            "confidence": 1.7,
            "sentiment": -3.0,
            "technicals": { "current_price": 50.0, "rsi": 140.0 },
        }))
        .expect("normalizes");

        assert_eq!(analysis.confidence, 1.0);
        assert_eq!(analysis.sentiment, -1.0);
        assert_eq!(analysis.technicals.rsi, 100.0);
        assert_eq!(analysis.price_change_pct, 4.0);
    }

    #[test]
    fn analysis_orderings_hold_even_for_inverted_input() {
        let analysis = stock_analysis(json!({
            "symbol": "IBM",
            "technicals": {
                "currentPrice": 100.0,
                "support": 110.0,
                "resistance": 90.0,
                "pivot": 200.0,
            },
            "priceTargets": { "bearish": 130.0, "bullish": 80.0, "base": 300.0 },
        }))
        .expect("normalizes");

        let t = &analysis.technicals;
        assert!(t.support <= t.pivot && t.pivot <= t.resistance);
        let p = &analysis.price_targets;
        assert!(p.bearish <= p.base && p.base <= p.bullish);
    }

    #[test]
    fn missing_discriminators_reject_with_parse() {
        let error = stock_analysis(json!({ "technicals": { "currentPrice": 10.0 } }))
            .expect_err("no symbol");
        assert_eq!(error.kind(), FetchErrorKind::Parse);

        let error = stock_analysis(json!({ "symbol": "IBM" })).expect_err("no technicals");
        assert_eq!(error.kind(), FetchErrorKind::Parse);

        let error = stock_opinion(json!({ "symbol": "IBM", "technical": { "price": 10.0 } }))
            .expect_err("no opinion block");
        assert_eq!(error.kind(), FetchErrorKind::Parse);
    }

    #[test]
    fn direction_deadband_is_exactly_five_hundredths() {
        assert_eq!(sentiment_direction(0.05), SentimentDirection::Neutral);
        assert_eq!(sentiment_direction(-0.05), SentimentDirection::Neutral);
        assert_eq!(sentiment_direction(0.051), SentimentDirection::Up);
        assert_eq!(sentiment_direction(-0.051), SentimentDirection::Down);
    }

    #[test]
    fn label_bands_cover_the_scale() {
        assert_eq!(sentiment_label(10.0), SentimentLabel::StrongNegative);
        assert_eq!(sentiment_label(30.0), SentimentLabel::ModeratelyNegative);
        assert_eq!(sentiment_label(50.0), SentimentLabel::Neutral);
        assert_eq!(sentiment_label(70.0), SentimentLabel::ModeratelyPositive);
        assert_eq!(sentiment_label(75.0), SentimentLabel::StrongPositive);
    }

    #[test]
    fn news_accepts_both_payload_shapes() {
        let article = json!({
            "title": "IBM beats estimates",
            "source": "Reuters",
            "sentiment": "Somewhat-Bullish",
            "key_phrases": "earnings, cloud, guidance",
        });

        let bare = news_articles(json!([article])).expect("bare list");
        let enveloped = news_articles(json!({ "news": [article] })).expect("envelope");
        assert_eq!(bare, enveloped);

        let only = &bare[0];
        assert_eq!(only.source_reliability, 85.0);
        assert_eq!(only.sentiment, SentimentTone::Positive);
        assert_eq!(only.key_phrases, vec!["earnings", "cloud", "guidance"]);
    }

    #[test]
    fn untitled_articles_are_dropped() {
        let articles = news_articles(json!([
            { "title": "Kept", "source": "Bloomberg" },
            { "source": "Reuters" },
            { "title": "   ", "source": "Reuters" },
        ]))
        .expect("normalizes");
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source_reliability, 95.0);
    }

    #[test]
    fn unknown_sources_score_seventy() {
        assert_eq!(source_reliability("Bloomberg"), 95.0);
        assert_eq!(source_reliability("yahoo finance"), 80.0);
        assert_eq!(source_reliability("Some Blog"), DEFAULT_RELIABILITY);
    }

    #[test]
    fn distribution_rescales_to_one_hundred() {
        let series = sentiment_series(json!({
            "symbol": "IBM",
            "sentiment": 0.2,
            "points": [{ "date": "2026-08-01", "score": 0.3 }],
            "distribution": { "positive": 2.0, "neutral": 1.0, "negative": 1.0 },
        }))
        .expect("normalizes");

        assert!((series.distribution.total() - 100.0).abs() <= 1.0);
        assert_eq!(series.distribution.positive, 50.0);
    }

    #[test]
    fn aggregate_confidence_blends_strength_and_reliability() {
        let articles = news_articles(json!([
            { "title": "a", "source": "Bloomberg" },
            { "title": "b", "source": "Some Blog" },
        ]))
        .expect("normalizes");

        // 0.65 * 40 + 0.35 * (95 + 70) / 2
        let confidence = news_aggregate_confidence(0.4, &articles);
        assert!((confidence - (0.65 * 40.0 + 0.35 * 82.5)).abs() < 1e-9);

        // Strength term saturates at 95.
        let saturated = news_aggregate_confidence(1.0, &articles);
        assert!((saturated - (0.65 * 95.0 + 0.35 * 82.5)).abs() < 1e-9);
    }

    #[test]
    fn news_digest_carries_the_aggregate_block() {
        let digest = news_digest(json!([
            { "title": "a", "source": "Bloomberg", "sentiment": "positive", "confidence": 0.8 },
            { "title": "b", "source": "Reuters", "sentiment": "negative", "confidence": 0.4 },
        ]))
        .expect("normalizes");

        // (0.8 - 0.4) / 2
        assert!((digest.sentiment - 0.2).abs() < 1e-9);
        // 0.65 * 20 + 0.35 * (95 + 85) / 2
        assert!((digest.confidence - (0.65 * 20.0 + 0.35 * 90.0)).abs() < 1e-9);

        let through_pipeline = normalize_for(
            ViewEndpoint::AnalyzedNews,
            json!([{ "title": "a", "source": "Bloomberg", "sentiment": "positive" }]),
        )
        .expect("normalizes");
        assert!(through_pipeline["articles"].is_array());
        assert!(through_pipeline["sentiment"].is_number());
        assert!(through_pipeline["confidence"].is_number());
    }

    #[test]
    fn empty_digest_is_neutral() {
        let digest = news_digest(json!([])).expect("normalizes");
        assert!(digest.articles.is_empty());
        assert_eq!(digest.sentiment, 0.0);
        assert_eq!(digest.confidence, 0.65 * 0.0 + 0.35 * DEFAULT_RELIABILITY);
    }

    #[test]
    fn epoch_timestamps_are_accepted() {
        let articles = news_articles(json!([
            { "title": "t", "source": "Reuters", "published_at": 1_720_000_000 },
        ]))
        .expect("normalizes");
        assert_eq!(articles[0].published_at.into_inner().year(), 2024);
    }
}
