//! CLI argument definitions for Sentiboard.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analysis` | Full sentiment analysis for a symbol |
//! | `opinion` | Buy/hold/sell opinion with technicals |
//! | `sentiment` | Sentiment time series |
//! | `news` | Sentiment-annotated news articles |
//! | `history` | Past prediction accuracy records |
//! | `search` | Symbol typeahead suggestions |
//! | `predict` | Classify a news headline |
//! | `predict-price` | Next-close prediction from a feature vector |
//! | `subscribe` | Subscribe an email to the newsletter |
//! | `symbols` | List symbols known to the service |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--mock` | `false` | Serve mock data, skip the network |
//! | `--refresh` | `false` | Bypass the cached copy and refetch |
//! | `--state-file` | env | Durable store path |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sentiboard_core::{HoldTime, Preferences, RiskLevel, TimeRange};

/// Stock sentiment dashboard client.
///
/// Drives the sentiboard data pipelines from the terminal: live data
/// with cached and mock fallback, symbol search, and the prediction
/// mutations.
#[derive(Debug, Parser)]
#[command(name = "sentiboard", author, version, about = "Stock sentiment dashboard client")]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Serve generated mock data without touching the network.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Bypass any cached copy and fetch fresh data.
    #[arg(long, global = true, default_value_t = false)]
    pub refresh: bool,

    /// Durable store path. Falls back to `SENTIBOARD_STATE_FILE`;
    /// memory-only when neither is set.
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full sentiment analysis for a symbol.
    ///
    /// # Examples
    ///
    ///   sentiboard analysis IBM
    ///   sentiboard analysis TSLA --risk high --hold short --detailed
    Analysis(AnalysisArgs),

    /// Buy/hold/sell opinion with supporting technicals.
    ///
    /// # Examples
    ///
    ///   sentiboard opinion AAPL
    ///   sentiboard opinion AAPL --detailed --range 30d
    Opinion(OpinionArgs),

    /// Sentiment time series for a symbol.
    ///
    /// # Examples
    ///
    ///   sentiboard sentiment MSFT --range 30d
    Sentiment(SentimentArgs),

    /// Sentiment-annotated news articles.
    ///
    /// # Examples
    ///
    ///   sentiboard news NVDA
    ///   sentiboard news NVDA --feed
    News(NewsArgs),

    /// Past prediction accuracy records.
    History(HistoryArgs),

    /// Symbol typeahead suggestions.
    ///
    /// # Examples
    ///
    ///   sentiboard search "international bus"
    Search(SearchArgs),

    /// Classify a news headline as bullish or bearish.
    ///
    /// # Examples
    ///
    ///   sentiboard predict "Chipmaker beats earnings estimates"
    Predict(PredictArgs),

    /// Predict the next close from a feature vector.
    ///
    /// # Examples
    ///
    ///   sentiboard predict-price --open 101.2 --close 102.8 --volume 3.2e6 --sentiment 0.4
    PredictPrice(PredictPriceArgs),

    /// Subscribe an email address to the newsletter.
    Subscribe(SubscribeArgs),

    /// List symbols known to the analysis service.
    Symbols,
}

/// Risk appetite options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RiskArg {
    Low,
    Medium,
    High,
}

impl From<RiskArg> for RiskLevel {
    fn from(arg: RiskArg) -> Self {
        match arg {
            RiskArg::Low => Self::Low,
            RiskArg::Medium => Self::Medium,
            RiskArg::High => Self::High,
        }
    }
}

/// Holding horizon options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HoldArg {
    Short,
    Medium,
    Long,
}

impl From<HoldArg> for HoldTime {
    fn from(arg: HoldArg) -> Self {
        match arg {
            HoldArg::Short => Self::Short,
            HoldArg::Medium => Self::Medium,
            HoldArg::Long => Self::Long,
        }
    }
}

/// Time range options for series-shaped views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeArg {
    #[value(name = "7d")]
    SevenDays,
    #[value(name = "30d")]
    ThirtyDays,
}

impl From<RangeArg> for TimeRange {
    fn from(arg: RangeArg) -> Self {
        match arg {
            RangeArg::SevenDays => Self::SevenDays,
            RangeArg::ThirtyDays => Self::ThirtyDays,
        }
    }
}

/// Investment preference flags shared by the preference-dependent views.
#[derive(Debug, Args)]
pub struct PreferenceArgs {
    /// Risk appetite.
    #[arg(long, value_enum, default_value_t = RiskArg::Medium)]
    pub risk: RiskArg,

    /// Holding horizon.
    #[arg(long, value_enum, default_value_t = HoldArg::Medium)]
    pub hold: HoldArg,

    /// Request the detailed narrative instead of the summary.
    #[arg(long, default_value_t = false)]
    pub detailed: bool,
}

impl PreferenceArgs {
    pub fn to_preferences(&self) -> Preferences {
        Preferences {
            risk: self.risk.into(),
            hold: self.hold.into(),
            detailed: self.detailed,
        }
    }
}

/// Arguments for the `analysis` command.
#[derive(Debug, Args)]
pub struct AnalysisArgs {
    /// Market symbol (e.g. IBM).
    pub symbol: String,

    #[command(flatten)]
    pub preferences: PreferenceArgs,
}

/// Arguments for the `opinion` command.
#[derive(Debug, Args)]
pub struct OpinionArgs {
    /// Market symbol.
    pub symbol: String,

    #[command(flatten)]
    pub preferences: PreferenceArgs,

    /// Opinion timeframe.
    #[arg(long, value_enum, default_value_t = RangeArg::SevenDays)]
    pub range: RangeArg,
}

/// Arguments for the `sentiment` command.
#[derive(Debug, Args)]
pub struct SentimentArgs {
    /// Market symbol.
    pub symbol: String,

    /// Series window.
    #[arg(long, value_enum, default_value_t = RangeArg::SevenDays)]
    pub range: RangeArg,
}

/// Arguments for the `news` command.
#[derive(Debug, Args)]
pub struct NewsArgs {
    /// Market symbol.
    pub symbol: String,

    /// Use the raw feed endpoint instead of the analyzed one.
    #[arg(long, default_value_t = false)]
    pub feed: bool,
}

/// Arguments for the `history` command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Market symbol.
    pub symbol: String,
}

/// Arguments for the `search` command.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-form query (symbol prefix or company name).
    pub query: String,
}

/// Arguments for the `predict` command.
#[derive(Debug, Args)]
pub struct PredictArgs {
    /// News headline or body text to classify.
    pub text: String,
}

/// Arguments for the `predict-price` command.
#[derive(Debug, Args)]
pub struct PredictPriceArgs {
    /// Opening price.
    #[arg(long)]
    pub open: f64,

    /// Closing price.
    #[arg(long)]
    pub close: f64,

    /// Trading volume.
    #[arg(long)]
    pub volume: f64,

    /// Aggregate sentiment score in [-1, 1].
    #[arg(long, allow_hyphen_values = true)]
    pub sentiment: f64,
}

/// Arguments for the `subscribe` command.
#[derive(Debug, Args)]
pub struct SubscribeArgs {
    /// Email address to register.
    pub email: String,
}
