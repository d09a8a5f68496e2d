//! Navigation state store
//!
//! Keeps the persisted document cached in memory and writes it through to
//! the durable backend on every mutation.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use compass_storage::{KeyValueStore, MemoryStore};

use crate::state::{PersistedState, StoredLocationParams};
use crate::Result;

pub const DEFAULT_STORAGE_KEY: &str = "navigation-state";

pub struct NavigationStateStore {
    /// Durable backend; swapped for a `MemoryStore` once it fails
    backend: Arc<RwLock<Arc<dyn KeyValueStore>>>,
    /// In-memory copy of the persisted document
    state: Arc<RwLock<PersistedState>>,
    storage_key: String,
    degraded: Arc<AtomicBool>,
}

impl NavigationStateStore {
    /// Open the store over `backend`, loading whatever a previous page load left behind
    pub fn new(backend: Arc<dyn KeyValueStore>, storage_key: impl Into<String>) -> Self {
        let store = Self {
            backend: Arc::new(RwLock::new(backend)),
            state: Arc::new(RwLock::new(PersistedState::default())),
            storage_key: storage_key.into(),
            degraded: Arc::new(AtomicBool::new(false)),
        };
        store.load();
        store
    }

    /// Non-persistent store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), DEFAULT_STORAGE_KEY)
    }

    fn load(&self) {
        let raw = self.backend.read().get(&self.storage_key);
        match raw {
            Ok(Some(json)) => match serde_json::from_str::<PersistedState>(&json) {
                Ok(state) => {
                    tracing::debug!(
                        locations = state.location_params.len(),
                        parents = state.last_visited_child.len(),
                        "Loaded navigation state"
                    );
                    *self.state.write() = state;
                }
                Err(e) => {
                    tracing::warn!("Discarding unreadable navigation state: {}", e);
                }
            },
            Ok(None) => {}
            Err(e) => self.degrade(&e.to_string()),
        }
    }

    /// Record the raw query string seen on `path`. Always overwrites.
    pub fn save_location_params(&self, path: &str, raw_query: &str) {
        self.mutate(|state| {
            state.location_params.insert(
                path.to_string(),
                StoredLocationParams {
                    params: raw_query.to_string(),
                    timestamp: Utc::now().timestamp_millis(),
                },
            );
        });
    }

    /// Record the full child location (path + query) last seen under `parent_prefix`
    pub fn save_last_visited_child(&self, parent_prefix: &str, child_location: &str) {
        self.mutate(|state| {
            state
                .last_visited_child
                .insert(parent_prefix.to_string(), child_location.to_string());
        });
    }

    pub fn restore_location_params(&self, path: &str) -> Option<String> {
        self.state
            .read()
            .location_params
            .get(path)
            .map(|entry| entry.params.clone())
    }

    pub fn restore_last_visited_child(&self, parent_prefix: &str) -> Option<String> {
        self.state
            .read()
            .last_visited_child
            .get(parent_prefix)
            .cloned()
    }

    /// Stored entry including its timestamp
    pub fn location_entry(&self, path: &str) -> Option<StoredLocationParams> {
        self.state.read().location_params.get(path).cloned()
    }

    /// Wipe both maps (logout, session reset)
    pub fn clear_all(&self) {
        *self.state.write() = PersistedState::default();

        let result = self.backend.read().remove(&self.storage_key);
        if let Err(e) = result {
            self.degrade(&e.to_string());
        }

        tracing::info!("Cleared navigation state");
    }

    /// Copy of the current document
    pub fn snapshot(&self) -> PersistedState {
        self.state.read().clone()
    }

    /// True once the durable backend failed and writes only reach memory
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.read().name()
    }

    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut PersistedState),
    {
        let json = {
            let mut state = self.state.write();
            f(&mut state);
            serde_json::to_string(&*state)
        };

        if let Err(e) = json
            .map_err(Into::into)
            .and_then(|json| self.persist(&json))
        {
            self.degrade(&e.to_string());
        }
    }

    fn persist(&self, json: &str) -> Result<()> {
        self.backend.read().set(&self.storage_key, json)?;
        Ok(())
    }

    fn degrade(&self, reason: &str) {
        if self.degraded.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::warn!(
            backend = self.backend_name(),
            "Navigation state storage unavailable, continuing in memory: {}",
            reason
        );
        *self.backend.write() = Arc::new(MemoryStore::new());
    }
}

impl Clone for NavigationStateStore {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            storage_key: self.storage_key.clone(),
            degraded: Arc::clone(&self.degraded),
        }
    }
}
