mod mutations;
mod search;
mod view;

use sentiboard_core::{Symbol, TimeRange, ViewEndpoint};

use crate::cli::{Cli, Command};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::Report;

pub async fn run(cli: &Cli) -> Result<Report, CliError> {
    let ctx = AppContext::from_cli(cli);

    match &cli.command {
        Command::Analysis(args) => {
            let symbol = Symbol::parse(&args.symbol)?;
            view::run(
                &ctx,
                ViewEndpoint::StockAnalysis,
                symbol,
                args.preferences.to_preferences(),
                TimeRange::SevenDays,
            )
            .await
        }
        Command::Opinion(args) => {
            let symbol = Symbol::parse(&args.symbol)?;
            view::run(
                &ctx,
                ViewEndpoint::StockOpinion,
                symbol,
                args.preferences.to_preferences(),
                args.range.into(),
            )
            .await
        }
        Command::Sentiment(args) => {
            let symbol = Symbol::parse(&args.symbol)?;
            view::run(
                &ctx,
                ViewEndpoint::SentimentAnalysis,
                symbol,
                Default::default(),
                args.range.into(),
            )
            .await
        }
        Command::News(args) => {
            let symbol = Symbol::parse(&args.symbol)?;
            let endpoint = if args.feed {
                ViewEndpoint::NewsFeed
            } else {
                ViewEndpoint::AnalyzedNews
            };
            view::run(&ctx, endpoint, symbol, Default::default(), TimeRange::SevenDays).await
        }
        Command::History(args) => {
            let symbol = Symbol::parse(&args.symbol)?;
            view::run(
                &ctx,
                ViewEndpoint::PredictionHistory,
                symbol,
                Default::default(),
                TimeRange::SevenDays,
            )
            .await
        }
        Command::Search(args) => search::run(&ctx, &args.query).await,
        Command::Predict(args) => mutations::predict_news(&ctx, &args.text).await,
        Command::PredictPrice(args) => mutations::predict_price(&ctx, args).await,
        Command::Subscribe(args) => mutations::subscribe(&ctx, &args.email).await,
        Command::Symbols => mutations::symbols(&ctx).await,
    }
}
