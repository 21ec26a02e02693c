//! Shared wiring for command handlers.

use std::sync::Arc;

use sentiboard_core::{
    CacheMode, Config, FetchOrchestrator, Gateway, HttpClient, MockPolicy, MockProviders,
    Mutations, PersistentStore, ReqwestHttpClient, SearchKeys, SymbolSearchAggregator,
};

use crate::cli::Cli;

/// Everything a command handler needs, wired once per invocation.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<PersistentStore>,
    pub gateway: Arc<Gateway>,
    pub orchestrator: Arc<FetchOrchestrator>,
    pub cache_mode: CacheMode,
    http: Arc<ReqwestHttpClient>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Self {
        let config = Config::from_env();
        let policy = MockPolicy::from_flags(cli.mock || config.use_mock, true);

        let state_file = cli.state_file.clone().or_else(|| config.state_file.clone());
        let store = Arc::new(match state_file {
            Some(path) => PersistentStore::open(path),
            None => PersistentStore::in_memory(),
        });

        let http = Arc::new(ReqwestHttpClient::new());
        let gateway = Arc::new(Gateway::new(
            config.api_base_url.clone(),
            Arc::clone(&http) as Arc<dyn HttpClient>,
        ));
        gateway.set_token(config.api_token.clone());

        let orchestrator = Arc::new(FetchOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            MockProviders::new(policy),
        ));

        let cache_mode = if cli.refresh {
            CacheMode::Refresh
        } else {
            CacheMode::Use
        };

        Self {
            config,
            store,
            gateway,
            orchestrator,
            cache_mode,
            http,
        }
    }

    pub fn mutations(&self) -> Mutations {
        Mutations::new(Arc::clone(&self.gateway))
    }

    pub fn search(&self) -> SymbolSearchAggregator {
        // Reuse the gateway's transport instead of standing up a second
        // connection pool per search.
        SymbolSearchAggregator::without_debounce(
            Arc::clone(&self.http) as Arc<dyn HttpClient>,
            SearchKeys::from(&self.config),
        )
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    #[test]
    fn search_reuses_the_gateway_transport() {
        let cli = Cli::parse_from(["sentiboard", "--mock", "symbols"]);
        let context = AppContext::from_cli(&cli);

        // One handle on the context, one inside the gateway.
        let before = Arc::strong_count(&context.http);
        assert!(before >= 2);

        let _search = context.search();
        assert_eq!(Arc::strong_count(&context.http), before + 1);
    }
}
