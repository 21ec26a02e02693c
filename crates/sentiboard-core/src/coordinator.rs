//! Selection ownership and pipeline invalidation.
//!
//! The coordinator owns `{symbol, preferences, active tab}` and is the
//! only writer of the selection keys in the store. Setters return the
//! request keys whose pipelines must (re)start; the consumer drives
//! the actual fetches so tests and the CLI stay in control of
//! awaiting them.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::watch;

use crate::domain::{ActiveTab, Preferences, Symbol, TimeRange};
use crate::fetch::{FetchOrchestrator, RequestKey, ViewEndpoint};
use crate::store::{keys, PersistentStore, StoreTier};

/// Current user selection, mirrored into the store lazily.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub symbol: Symbol,
    pub preferences: Preferences,
    pub active_tab: ActiveTab,
    pub time_range: TimeRange,
}

/// Preferences gate for the current symbol. `Unset` renders the
/// preferences form; submission moves to `Set` and starts the initial
/// fetches; only an explicit edit moves back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferencesGate {
    Unset,
    Set,
}

/// Owns the selection and invalidates dependent pipelines on change.
pub struct ViewStateCoordinator {
    store: Arc<PersistentStore>,
    orchestrator: Arc<FetchOrchestrator>,
    selection: watch::Sender<Selection>,
    gate: Mutex<PreferencesGate>,
}

impl ViewStateCoordinator {
    /// Rehydrate the selection from the store; absent keys fall back
    /// to the defaults (`IBM`, medium/medium/summary, opinion tab).
    pub fn new(store: Arc<PersistentStore>, orchestrator: Arc<FetchOrchestrator>) -> Self {
        let symbol = store
            .get(StoreTier::Durable, keys::LAST_VIEWED_SYMBOL)
            .and_then(|value| value.as_str().and_then(|text| Symbol::parse(text).ok()))
            .unwrap_or_else(Symbol::default_symbol);
        let preferences = load_preferences(&store, &symbol);
        let active_tab = store
            .get(StoreTier::Session, keys::DASHBOARD_ACTIVE_TAB)
            .and_then(|value| value.as_str().and_then(|text| ActiveTab::parse(text).ok()))
            .unwrap_or(ActiveTab::Opinion);
        let gate = load_gate(&store, &symbol);

        let (selection, _) = watch::channel(Selection {
            symbol,
            preferences,
            active_tab,
            time_range: TimeRange::SevenDays,
        });

        Self {
            store,
            orchestrator,
            selection,
            gate: Mutex::new(gate),
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.selection.subscribe()
    }

    pub fn preferences_gate(&self) -> PreferencesGate {
        *self.gate.lock().expect("gate lock should not be poisoned")
    }

    /// Switch the viewed symbol. Every pipeline keyed on the previous
    /// symbol is superseded; per-symbol preferences and the gate are
    /// rehydrated. Returns the keys for the new symbol's views.
    pub fn set_symbol(&self, symbol: Symbol) -> Vec<RequestKey> {
        let previous = self.selection.borrow().clone();
        if previous.symbol == symbol {
            return Vec::new();
        }

        self.orchestrator.supersede(&previous.symbol);
        self.store.set(
            StoreTier::Durable,
            keys::LAST_VIEWED_SYMBOL,
            json!(symbol.as_str()),
        );

        let preferences = load_preferences(&self.store, &symbol);
        {
            let mut gate = self.gate.lock().expect("gate lock should not be poisoned");
            *gate = load_gate(&self.store, &symbol);
        }

        let next = Selection {
            symbol,
            preferences,
            ..previous
        };
        let fetch_keys = self.view_keys(&next);
        self.selection.send_replace(next);
        fetch_keys
    }

    /// Write preferences through to the store and invalidate the
    /// preference-dependent pipelines (news is unaffected). Returns
    /// the keys to refetch.
    pub fn set_preferences(&self, preferences: Preferences) -> Vec<RequestKey> {
        let current = self.selection.borrow().clone();
        let encoded = match serde_json::to_value(preferences) {
            Ok(encoded) => encoded,
            Err(error) => {
                log::warn!("preferences failed to encode: {error}");
                json!({})
            }
        };
        // Per-symbol key is authoritative; the global key seeds other
        // symbols that have no entry yet.
        self.store.set(
            StoreTier::Durable,
            &keys::preferences(&current.symbol),
            encoded.clone(),
        );
        self.store
            .set(StoreTier::Durable, keys::INVESTMENT_PREFERENCES, encoded);

        self.orchestrator.supersede_matching(|key| {
            key.symbol == current.symbol && key.endpoint.preference_dependent()
        });

        let next = Selection {
            preferences,
            ..current
        };
        let fetch_keys = self
            .view_keys(&next)
            .into_iter()
            .filter(|key| key.endpoint.preference_dependent())
            .collect();
        self.selection.send_replace(next);
        fetch_keys
    }

    /// Submit the preferences form: write through, open the gate, and
    /// return the initial fetch keys for every view.
    pub fn submit_preferences(&self, preferences: Preferences) -> Vec<RequestKey> {
        self.set_preferences(preferences);
        let selection = self.selection.borrow().clone();
        self.store.set(
            StoreTier::Durable,
            &keys::prefs_set(&selection.symbol),
            json!(true),
        );
        {
            let mut gate = self.gate.lock().expect("gate lock should not be poisoned");
            *gate = PreferencesGate::Set;
        }
        self.view_keys(&selection)
    }

    /// Explicit "edit preferences": reopen the form without touching
    /// the stored values.
    pub fn edit_preferences(&self) {
        let symbol = self.selection.borrow().symbol.clone();
        self.store
            .set(StoreTier::Durable, &keys::prefs_set(&symbol), json!(false));
        let mut gate = self.gate.lock().expect("gate lock should not be poisoned");
        *gate = PreferencesGate::Unset;
    }

    /// UI-only; no pipeline is invalidated.
    pub fn set_active_tab(&self, tab: ActiveTab) {
        self.store.set(
            StoreTier::Session,
            keys::DASHBOARD_ACTIVE_TAB,
            json!(tab.as_str()),
        );
        self.selection.send_modify(|selection| {
            selection.active_tab = tab;
        });
    }

    /// Switch the sentiment window; returns the sentiment key to
    /// refetch.
    pub fn set_time_range(&self, range: TimeRange) -> RequestKey {
        self.selection.send_modify(|selection| {
            selection.time_range = range;
        });
        let selection = self.selection.borrow().clone();
        RequestKey::for_view(
            ViewEndpoint::SentimentAnalysis,
            &selection.symbol,
            &selection.preferences,
            selection.time_range,
        )
    }

    fn view_keys(&self, selection: &Selection) -> Vec<RequestKey> {
        ViewEndpoint::ALL
            .iter()
            .map(|endpoint| {
                RequestKey::for_view(
                    *endpoint,
                    &selection.symbol,
                    &selection.preferences,
                    selection.time_range,
                )
            })
            .collect()
    }
}

impl std::fmt::Debug for ViewStateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStateCoordinator")
            .field("selection", &self.selection.borrow().clone())
            .finish_non_exhaustive()
    }
}

fn load_preferences(store: &PersistentStore, symbol: &Symbol) -> Preferences {
    let per_symbol = store.get(StoreTier::Durable, &keys::preferences(symbol));
    let value = per_symbol.or_else(|| store.get(StoreTier::Durable, keys::INVESTMENT_PREFERENCES));
    value
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

fn load_gate(store: &PersistentStore, symbol: &Symbol) -> PreferencesGate {
    let set = store
        .get(StoreTier::Durable, &keys::prefs_set(symbol))
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    if set {
        PreferencesGate::Set
    } else {
        PreferencesGate::Unset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockPolicy;
    use crate::domain::{HoldTime, RiskLevel};
    use crate::gateway::Gateway;
    use crate::mock::MockProviders;

    fn coordinator_with(store: Arc<PersistentStore>) -> ViewStateCoordinator {
        let gateway = Arc::new(Gateway::new(
            "/api",
            Arc::new(crate::gateway::ReqwestHttpClient::new()),
        ));
        let orchestrator = Arc::new(FetchOrchestrator::new(
            Arc::clone(&store),
            gateway,
            MockProviders::without_delay(MockPolicy::forced_mock()),
        ));
        ViewStateCoordinator::new(store, orchestrator)
    }

    #[test]
    fn cold_start_uses_defaults() {
        let coordinator = coordinator_with(Arc::new(PersistentStore::in_memory()));
        let selection = coordinator.selection();

        assert_eq!(selection.symbol.as_str(), "IBM");
        assert_eq!(selection.preferences, Preferences::default());
        assert_eq!(selection.active_tab, ActiveTab::Opinion);
        assert_eq!(coordinator.preferences_gate(), PreferencesGate::Unset);
    }

    #[test]
    fn rehydrates_last_symbol_and_per_symbol_preferences() {
        let store = Arc::new(PersistentStore::in_memory());
        store.set(StoreTier::Durable, keys::LAST_VIEWED_SYMBOL, json!("TSLA"));
        let tsla = Symbol::parse("TSLA").expect("valid");
        store.set(
            StoreTier::Durable,
            &keys::preferences(&tsla),
            json!({"risk": "high", "hold": "short", "detailed": true}),
        );
        store.set(StoreTier::Durable, &keys::prefs_set(&tsla), json!(true));

        let coordinator = coordinator_with(store);
        let selection = coordinator.selection();
        assert_eq!(selection.symbol, tsla);
        assert_eq!(selection.preferences.risk, RiskLevel::High);
        assert_eq!(selection.preferences.hold, HoldTime::Short);
        assert!(selection.preferences.detailed);
        assert_eq!(coordinator.preferences_gate(), PreferencesGate::Set);
    }

    #[test]
    fn global_preferences_seed_unseen_symbols() {
        let store = Arc::new(PersistentStore::in_memory());
        store.set(
            StoreTier::Durable,
            keys::INVESTMENT_PREFERENCES,
            json!({"risk": "low", "hold": "long", "detailed": false}),
        );

        let coordinator = coordinator_with(store);
        assert_eq!(coordinator.selection().preferences.risk, RiskLevel::Low);
    }

    #[test]
    fn set_symbol_persists_and_rehydrates_the_gate() {
        let store = Arc::new(PersistentStore::in_memory());
        let coordinator = coordinator_with(Arc::clone(&store));

        let aapl = Symbol::parse("AAPL").expect("valid");
        let fetch_keys = coordinator.set_symbol(aapl.clone());
        assert_eq!(fetch_keys.len(), ViewEndpoint::ALL.len());
        assert!(fetch_keys.iter().all(|key| key.symbol == aapl));
        assert_eq!(
            store.get(StoreTier::Durable, keys::LAST_VIEWED_SYMBOL),
            Some(json!("AAPL"))
        );

        // Same symbol again is a no-op.
        assert!(coordinator.set_symbol(aapl).is_empty());
    }

    #[test]
    fn set_preferences_targets_preference_dependent_views_only() {
        let store = Arc::new(PersistentStore::in_memory());
        let coordinator = coordinator_with(Arc::clone(&store));

        let preferences = Preferences {
            risk: RiskLevel::High,
            hold: HoldTime::Long,
            detailed: true,
        };
        let fetch_keys = coordinator.set_preferences(preferences);
        assert_eq!(fetch_keys.len(), 3);
        assert!(fetch_keys
            .iter()
            .all(|key| key.endpoint.preference_dependent()));

        let symbol = coordinator.selection().symbol;
        assert!(store
            .get(StoreTier::Durable, &keys::preferences(&symbol))
            .is_some());
        assert!(store
            .get(StoreTier::Durable, keys::INVESTMENT_PREFERENCES)
            .is_some());
    }

    #[test]
    fn gate_transitions_on_submit_and_edit_only() {
        let store = Arc::new(PersistentStore::in_memory());
        let coordinator = coordinator_with(Arc::clone(&store));
        assert_eq!(coordinator.preferences_gate(), PreferencesGate::Unset);

        let fetch_keys = coordinator.submit_preferences(Preferences::default());
        assert_eq!(coordinator.preferences_gate(), PreferencesGate::Set);
        assert_eq!(fetch_keys.len(), ViewEndpoint::ALL.len());
        let symbol = coordinator.selection().symbol;
        assert_eq!(
            store.get(StoreTier::Durable, &keys::prefs_set(&symbol)),
            Some(json!(true))
        );

        // Reload re-enters in the set state.
        let reloaded = coordinator_with(Arc::clone(&store));
        assert_eq!(reloaded.preferences_gate(), PreferencesGate::Set);

        reloaded.edit_preferences();
        assert_eq!(reloaded.preferences_gate(), PreferencesGate::Unset);
    }

    #[test]
    fn active_tab_is_ui_only() {
        let store = Arc::new(PersistentStore::in_memory());
        let coordinator = coordinator_with(Arc::clone(&store));

        coordinator.set_active_tab(ActiveTab::News);
        assert_eq!(coordinator.selection().active_tab, ActiveTab::News);
        assert_eq!(
            store.get(StoreTier::Session, keys::DASHBOARD_ACTIVE_TAB),
            Some(json!("news"))
        );
    }

    #[test]
    fn time_range_switch_rekeys_the_sentiment_view() {
        let coordinator = coordinator_with(Arc::new(PersistentStore::in_memory()));
        let key = coordinator.set_time_range(TimeRange::ThirtyDays);
        assert_eq!(key.endpoint, ViewEndpoint::SentimentAnalysis);
        assert_eq!(key.params, "time_range=30d");
    }
}
