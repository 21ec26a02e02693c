//! Two-tier key/value store for session state and response caches.
//!
//! The durable tier is a single JSON document on disk that survives
//! restarts; the session tier lives in memory for the lifetime of the
//! process. Read or write failures degrade the store to memory-only
//! and are never fatal. Listener delivery is synchronous and
//! process-local; cross-instance coordination is out of scope.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::domain::Symbol;

/// Well-known store keys shared between the coordinator and the
/// orchestrator. Per-symbol keys are built by the helper functions.
pub mod keys {
    use super::Symbol;

    pub const LAST_VIEWED_SYMBOL: &str = "lastViewedSymbol";
    pub const INVESTMENT_PREFERENCES: &str = "investmentPreferences";
    pub const NEWS_ANALYSIS_SYMBOL: &str = "newsAnalysisSymbol";
    pub const NEWS_ANALYSIS_EXPANDED: &str = "newsAnalysisExpanded";
    pub const DASHBOARD_ACTIVE_TAB: &str = "dashboard_active_tab";

    pub fn preferences(symbol: &Symbol) -> String {
        format!("preferences_{}", symbol.as_str())
    }

    pub fn prefs_set(symbol: &Symbol) -> String {
        format!("prefsSet_{}", symbol.as_str())
    }

    pub fn stock_data(symbol: &Symbol) -> String {
        format!("stockData-{}", symbol.as_str())
    }
}

/// Storage tier selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTier {
    /// Survives process restart (JSON file).
    Durable,
    /// Survives in-app navigation only (memory).
    Session,
}

type Listener = Box<dyn Fn(&str, Option<&Value>) + Send + Sync>;

/// Process-wide persistent store.
pub struct PersistentStore {
    path: Option<PathBuf>,
    durable: Mutex<HashMap<String, Value>>,
    session: Mutex<HashMap<String, Value>>,
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
    degraded: AtomicBool,
}

impl PersistentStore {
    /// Open the durable tier at `path`, loading any existing document.
    /// A corrupt or unreadable file leaves the store memory-only.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let (durable, degraded) = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, Value>>(&raw) {
                Ok(map) => (map, false),
                Err(error) => {
                    log::warn!("store file {} is corrupt, starting empty: {error}", path.display());
                    (HashMap::new(), false)
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                (HashMap::new(), false)
            }
            Err(error) => {
                log::warn!(
                    "cannot read store file {}, degrading to memory-only: {error}",
                    path.display()
                );
                (HashMap::new(), true)
            }
        };

        Self {
            path: Some(path),
            durable: Mutex::new(durable),
            session: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            degraded: AtomicBool::new(degraded),
        }
    }

    /// Memory-only store; both tiers behave, nothing survives restart.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            durable: Mutex::new(HashMap::new()),
            session: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn get(&self, tier: StoreTier, key: &str) -> Option<Value> {
        let map = self.map_for(tier).lock().expect("store lock poisoned");
        map.get(key).cloned()
    }

    pub fn set(&self, tier: StoreTier, key: &str, value: Value) {
        {
            let mut map = self.map_for(tier).lock().expect("store lock poisoned");
            map.insert(key.to_owned(), value.clone());
        }

        if tier == StoreTier::Durable {
            self.flush();
        }
        self.notify(key, Some(&value));
    }

    pub fn remove(&self, tier: StoreTier, key: &str) {
        let removed = {
            let mut map = self.map_for(tier).lock().expect("store lock poisoned");
            map.remove(key).is_some()
        };

        if removed {
            if tier == StoreTier::Durable {
                self.flush();
            }
            self.notify(key, None);
        }
    }

    /// Register a listener for one key. Delivery is synchronous on the
    /// writing thread; a removed key is delivered as `None`.
    pub fn subscribe(
        &self,
        key: &str,
        listener: impl Fn(&str, Option<&Value>) + Send + Sync + 'static,
    ) {
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners
            .entry(key.to_owned())
            .or_default()
            .push(Box::new(listener));
    }

    /// True once a disk write has failed and the store runs memory-only.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn map_for(&self, tier: StoreTier) -> &Mutex<HashMap<String, Value>> {
        match tier {
            StoreTier::Durable => &self.durable,
            StoreTier::Session => &self.session,
        }
    }

    fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if self.degraded.load(Ordering::Relaxed) {
            return;
        }

        let snapshot = {
            let map = self.durable.lock().expect("store lock poisoned");
            serde_json::to_string(&*map)
        };

        let result = snapshot
            .map_err(std::io::Error::other)
            .and_then(|encoded| fs::write(path, encoded));

        if let Err(error) = result {
            log::warn!(
                "store write to {} failed, degrading to memory-only: {error}",
                path.display()
            );
            self.degraded.store(true, Ordering::Relaxed);
        }
    }

    fn notify(&self, key: &str, value: Option<&Value>) {
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        if let Some(registered) = listeners.get(key) {
            for listener in registered {
                listener(key, value);
            }
        }
    }
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("path", &self.path)
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn durable_values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");

        let store = PersistentStore::open(&path);
        store.set(StoreTier::Durable, keys::LAST_VIEWED_SYMBOL, json!("AAPL"));
        drop(store);

        let reopened = PersistentStore::open(&path);
        assert_eq!(
            reopened.get(StoreTier::Durable, keys::LAST_VIEWED_SYMBOL),
            Some(json!("AAPL"))
        );
    }

    #[test]
    fn session_values_do_not_touch_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");

        let store = PersistentStore::open(&path);
        store.set(StoreTier::Session, keys::NEWS_ANALYSIS_EXPANDED, json!(true));
        drop(store);

        let reopened = PersistentStore::open(&path);
        assert_eq!(
            reopened.get(StoreTier::Session, keys::NEWS_ANALYSIS_EXPANDED),
            None
        );
    }

    #[test]
    fn values_round_trip_unchanged() {
        let store = PersistentStore::in_memory();
        let entry = json!({
            "payload": {"symbol": "IBM", "confidence": 0.75},
            "timestamp": "2024-01-01T00:00:00Z",
        });

        store.set(StoreTier::Durable, "stockData-IBM", entry.clone());
        assert_eq!(store.get(StoreTier::Durable, "stockData-IBM"), Some(entry));
    }

    #[test]
    fn listeners_fire_synchronously_on_set_and_remove() {
        let store = PersistentStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&calls);

        store.subscribe(keys::DASHBOARD_ACTIVE_TAB, move |_, value| {
            observed.fetch_add(1, Ordering::SeqCst);
            if observed.load(Ordering::SeqCst) == 2 {
                assert!(value.is_none());
            }
        });

        store.set(StoreTier::Session, keys::DASHBOARD_ACTIVE_TAB, json!("news"));
        store.remove(StoreTier::Session, keys::DASHBOARD_ACTIVE_TAB);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn corrupt_file_starts_empty_without_panicking() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json at all").expect("write");

        let store = PersistentStore::open(&path);
        assert_eq!(store.get(StoreTier::Durable, "anything"), None);

        store.set(StoreTier::Durable, "k", json!(1));
        assert_eq!(store.get(StoreTier::Durable, "k"), Some(json!(1)));
    }

    #[test]
    fn per_symbol_keys_embed_the_symbol() {
        let symbol = Symbol::parse("tsla").expect("valid symbol");
        assert_eq!(keys::preferences(&symbol), "preferences_TSLA");
        assert_eq!(keys::prefs_set(&symbol), "prefsSet_TSLA");
        assert_eq!(keys::stock_data(&symbol), "stockData-TSLA");
    }
}
