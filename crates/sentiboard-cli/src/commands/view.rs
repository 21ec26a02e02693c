use sentiboard_core::{
    CancelToken, FetchState, Preferences, RequestKey, Symbol, TimeRange, ViewEndpoint,
};

use crate::context::AppContext;
use crate::error::CliError;
use crate::output::Report;

/// Run one view pipeline to a terminal state and report its payload.
pub async fn run(
    ctx: &AppContext,
    endpoint: ViewEndpoint,
    symbol: Symbol,
    preferences: Preferences,
    range: TimeRange,
) -> Result<Report, CliError> {
    let key = RequestKey::for_view(endpoint, &symbol, &preferences, range);
    log::debug!("fetching {key}");

    let state = ctx
        .orchestrator
        .fetch(key, ctx.cache_mode, &CancelToken::new())
        .await;

    match state {
        FetchState::Success { payload, advisory } => {
            Ok(Report::new(payload).with_advisory(advisory))
        }
        FetchState::Stale { payload, advisory } => {
            Ok(Report::new(payload).with_advisory(Some(advisory)))
        }
        FetchState::Error { error } => Err(CliError::Fetch(error)),
        FetchState::Idle | FetchState::Loading => {
            Err(CliError::Command(String::from("fetch did not complete")))
        }
    }
}
