use sentiboard_core::PriceFeatures;
use serde_json::json;

use crate::cli::PredictPriceArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::Report;

pub async fn predict_news(ctx: &AppContext, text: &str) -> Result<Report, CliError> {
    let outcome = ctx.mutations().predict_news(text).await?;
    Ok(Report::new(serde_json::to_value(outcome)?))
}

pub async fn predict_price(
    ctx: &AppContext,
    args: &PredictPriceArgs,
) -> Result<Report, CliError> {
    let features = PriceFeatures {
        open: args.open,
        close: args.close,
        volume: args.volume,
        sentiment: args.sentiment,
    };
    let prediction = ctx.mutations().predict_price(features).await?;
    Ok(Report::new(serde_json::to_value(prediction)?))
}

pub async fn subscribe(ctx: &AppContext, email: &str) -> Result<Report, CliError> {
    ctx.mutations().subscribe(email).await?;
    Ok(Report::new(json!({ "subscribed": email })))
}

pub async fn symbols(ctx: &AppContext) -> Result<Report, CliError> {
    let symbols = ctx.mutations().symbol_directory().await?;
    Ok(Report::new(json!({ "symbols": symbols })))
}
