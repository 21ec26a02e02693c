use serde_json::json;

use crate::context::AppContext;
use crate::error::CliError;
use crate::output::Report;

pub async fn run(ctx: &AppContext, query: &str) -> Result<Report, CliError> {
    let suggestions = ctx.search().suggest(query).await?;
    Ok(Report::new(json!({ "suggestions": suggestions })))
}
