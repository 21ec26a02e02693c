//! Deterministic-per-symbol mock payload generators.
//!
//! Each generator returns a payload in the same raw shape as the real
//! endpoint, so mock data flows through the normalizer like live data.
//! Values derive from a stable fold over the symbol bytes; an
//! artificial delay keeps loading states observable.

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::MockPolicy;
use crate::domain::{Symbol, TimeRange, UtcDateTime};
use crate::fetch::ViewEndpoint;

const TIER1_SOURCES: [&str; 4] = ["Bloomberg", "Financial Times", "Reuters", "Yahoo Finance"];

/// Mock generators for every view, selected by [`MockPolicy`].
#[derive(Debug, Clone)]
pub struct MockProviders {
    policy: MockPolicy,
    delay_ms: std::ops::RangeInclusive<u64>,
}

impl MockProviders {
    pub fn new(policy: MockPolicy) -> Self {
        Self {
            policy,
            delay_ms: 200..=800,
        }
    }

    /// Zero-delay variant for deterministic tests.
    pub fn without_delay(policy: MockPolicy) -> Self {
        Self {
            policy,
            delay_ms: 0..=0,
        }
    }

    pub const fn policy(&self) -> MockPolicy {
        self.policy
    }

    /// Generate the mock payload for one view, after the artificial
    /// delay. Infallible; every endpoint has a generator.
    pub async fn generate(&self, endpoint: ViewEndpoint, symbol: &Symbol, params: &str) -> Value {
        let delay = if *self.delay_ms.end() == 0 {
            0
        } else {
            fastrand::u64(self.delay_ms.clone())
        };
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match endpoint {
            ViewEndpoint::StockAnalysis => stock_analysis(symbol),
            ViewEndpoint::StockOpinion => stock_opinion(symbol),
            ViewEndpoint::SentimentAnalysis => sentiment_series(symbol, params),
            ViewEndpoint::AnalyzedNews => Value::Array(articles(symbol)),
            ViewEndpoint::NewsFeed => json!({ "news": articles(symbol) }),
            ViewEndpoint::PredictionHistory => prediction_history(symbol),
        }
    }
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(7_u64, |acc, byte| {
        acc.wrapping_mul(37).wrapping_add(byte as u64)
    })
}

fn base_price(seed: u64) -> f64 {
    91.0 + (seed % 520) as f64 / 10.0
}

fn sentiment_score(seed: u64) -> f64 {
    // Spread over [-0.9, 0.9] so every label band is reachable.
    ((seed % 181) as f64 - 90.0) / 100.0
}

fn technicals(symbol: &Symbol) -> Value {
    let seed = symbol_seed(symbol);
    let price = base_price(seed);
    json!({
        "current_price": price,
        "rsi": 25.0 + (seed % 50) as f64,
        "sma50": price * 0.99,
        "sma200": price * if seed % 2 == 0 { 0.97 } else { 1.01 },
        "support": price * 0.95,
        "resistance": price * 1.05,
        "pivot": price,
        "volume": 1_000_000 + (seed % 9_000) * 1_000,
    })
}

fn stock_analysis(symbol: &Symbol) -> Value {
    let seed = symbol_seed(symbol);
    let price = base_price(seed);
    let sentiment = sentiment_score(seed);
    let recommendation = if sentiment > 0.15 {
        "BUY"
    } else if sentiment < -0.15 {
        "SELL"
    } else {
        "HOLD"
    };

    json!({
        "company": format!("{} Corporation", symbol.as_str()),
        "symbol": symbol.as_str(),
        "last_updated": UtcDateTime::now(),
        "recommendation": recommendation,
        "confidence": 0.55 + (seed % 40) as f64 / 100.0,
        "sentiment": sentiment,
        "technicals": technicals(symbol),
        "price_targets": {
            "base": price * (1.05 + 0.1 * sentiment),
            "bullish": price * (1.15 + 0.1 * sentiment),
            "bearish": price * (0.95 + 0.05 * sentiment),
            "consensus": price * (1.05 + 0.08 * sentiment),
        },
        "key_factors": key_factors(seed),
        "risk_assessment": {
            "level": (["low", "medium", "high"][(seed % 3) as usize]),
            "description": "Volatility and sentiment dispersion within normal bounds",
        },
    })
}

fn stock_opinion(symbol: &Symbol) -> Value {
    let seed = symbol_seed(symbol);
    let sentiment = sentiment_score(seed);
    let action = if sentiment > 0.15 {
        "BUY"
    } else if sentiment < -0.15 {
        "SELL"
    } else {
        "HOLD"
    };

    json!({
        "symbol": symbol.as_str(),
        "technical": technicals(symbol),
        "opinion": {
            "action": action,
            "confidence": 0.55 + (seed % 40) as f64 / 100.0,
            "rationale": [
                "News sentiment aggregated over the last thirty days",
                "Momentum confirmed against the 50/200 day averages",
            ],
        },
        "factors": key_factors(seed),
    })
}

fn key_factors(seed: u64) -> Value {
    json!([
        {
            "title": "News sentiment",
            "description": "Aggregated tone of recent coverage",
            "impact": if seed % 3 == 0 { "negative" } else { "positive" },
        },
        {
            "title": "Momentum",
            "description": "Price action relative to moving averages",
            "impact": if seed % 2 == 0 { "positive" } else { "neutral" },
        },
    ])
}

fn sentiment_series(symbol: &Symbol, params: &str) -> Value {
    let seed = symbol_seed(symbol);
    let sentiment = sentiment_score(seed);
    let days = if params.contains(TimeRange::ThirtyDays.as_str()) {
        30
    } else {
        7
    };

    let today = UtcDateTime::now().into_inner().date();
    let points: Vec<Value> = (0..days)
        .rev()
        .map(|back| {
            let date = today - time::Duration::days(back);
            let wobble = ((seed.wrapping_add(back as u64) % 21) as f64 - 10.0) / 50.0;
            json!({
                "date": format!("{:04}-{:02}-{:02}", date.year(), date.month() as u8, date.day()),
                "score": (sentiment + wobble).clamp(-1.0, 1.0),
            })
        })
        .collect();

    let positive = 33.0 + (seed % 30) as f64;
    let negative = (100.0 - positive) * 0.4;
    let neutral = 100.0 - positive - negative;
    let news_count = 8 + (seed % 12);

    json!({
        "symbol": symbol.as_str(),
        "sentiment": sentiment,
        "news_count": news_count,
        "points": points,
        "distribution": { "positive": positive, "neutral": neutral, "negative": negative },
        "source_stats": {
            "tier1_count": 2,
            "tier1_sources": ["Bloomberg", "Reuters"],
            "reliability_sum": news_count as f64 * 80.0,
            "news_count": news_count,
        },
    })
}

fn articles(symbol: &Symbol) -> Vec<Value> {
    let seed = symbol_seed(symbol);
    let now = UtcDateTime::now().into_inner();

    (0..5)
        .map(|index| {
            let source = TIER1_SOURCES[((seed as usize) + index) % TIER1_SOURCES.len()];
            let tone = ["positive", "neutral", "negative"][(seed as usize + index) % 3];
            let published = now - time::Duration::hours(3 * (index as i64 + 1));
            json!({
                "url": format!(
                    "https://news.example.com/{}/{index}",
                    symbol.as_str().to_ascii_lowercase()
                ),
                "title": format!("{} {} outlook, analysts weigh in", symbol.as_str(), tone),
                "summary": format!(
                    "Coverage of {} centered on earnings guidance and sector rotation.",
                    symbol.as_str()
                ),
                "source": source,
                // Epoch seconds, one of the upstream timestamp shapes.
                "published_at": published.unix_timestamp(),
                "sentiment": tone,
                "confidence": 0.6 + ((seed as usize + index) % 35) as f64 / 100.0,
                // Comma string on purpose; the normalizer splits it.
                "key_phrases": "earnings, guidance, sector rotation",
            })
        })
        .collect()
}

fn prediction_history(symbol: &Symbol) -> Value {
    let seed = symbol_seed(symbol);
    let price = base_price(seed);
    let today = UtcDateTime::now().into_inner().date();

    let records: Vec<Value> = (0..10)
        .rev()
        .map(|back| {
            let date = today - time::Duration::days(back);
            let drift = ((seed.wrapping_add(back as u64) % 11) as f64 - 5.0) / 100.0;
            let predicted = price * (1.0 + drift);
            let mut record = json!({
                "date": format!("{:04}-{:02}-{:02}", date.year(), date.month() as u8, date.day()),
                "predicted": predicted,
            });
            if back > 0 {
                record["actual"] = json!(predicted * (1.0 + drift / 2.0));
            }
            record
        })
        .collect();

    json!({ "symbol": symbol.as_str(), "records": records })
}
