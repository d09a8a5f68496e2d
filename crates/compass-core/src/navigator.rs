//! Navigator: one instance of every component, wired together

use std::sync::Arc;

use compass_resolver::{
    ParamUpdates, RegisteredResolver, RegistryState, Resolution, ResolutionOrchestrator,
    ResolverHandle, ResolverRegistration, ResolverRegistry, UpdateOptions,
};
use compass_routing::{Location, LocationProvider, ParamValue, ParameterMap};
use compass_session::NavigationStateStore;
use compass_storage::{Database, KeyValueStore, MemoryStore, SqliteStore};
use compass_sync::LocationSyncController;

use crate::config::Config;
use crate::Result;

/// Open the state store described by `config`.
///
/// Fails if the database file cannot be opened; see `Navigator::new` for
/// the degrading variant.
pub fn open_store(config: &Config) -> Result<NavigationStateStore> {
    let backend: Arc<dyn KeyValueStore> = match &config.database_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let db = Database::open(path)?;
            let pruned = db.prune_scopes(&config.session_scope)?;
            if pruned > 0 {
                tracing::debug!(pruned, "Pruned navigation state of earlier sessions");
            }
            Arc::new(SqliteStore::new(db, config.session_scope.clone()))
        }
        None => Arc::new(MemoryStore::new()),
    };

    Ok(NavigationStateStore::new(backend, config.storage_key.clone()))
}

pub struct Navigator {
    config: Config,
    location: Arc<dyn LocationProvider>,
    store: NavigationStateStore,
    orchestrator: Arc<ResolutionOrchestrator>,
    controller: LocationSyncController,
}

impl Navigator {
    /// Build a navigator over `location`.
    ///
    /// An unusable database does not fail construction: navigation state
    /// is then kept in memory for the lifetime of the navigator.
    pub fn new(config: Config, location: Arc<dyn LocationProvider>) -> Result<Self> {
        config.validate()?;

        let store = match open_store(&config) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(
                    path = ?config.database_path,
                    "Navigation state database unavailable, continuing in memory: {}",
                    e
                );
                let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
                NavigationStateStore::new(backend, config.storage_key.clone())
            }
        };

        Ok(Self::with_store(config, location, store))
    }

    pub fn with_store(
        config: Config,
        location: Arc<dyn LocationProvider>,
        store: NavigationStateStore,
    ) -> Self {
        let orchestrator = ResolutionOrchestrator::new(
            ResolverRegistry::new(),
            Arc::clone(&location),
            store.clone(),
        );
        let controller = LocationSyncController::new(Arc::clone(&location), store.clone())
            .with_settle_delay(config.settle_delay());

        tracing::info!(
            backend = store.backend_name(),
            session_scope = %config.session_scope,
            "Navigator initialized"
        );

        Self {
            config,
            location,
            store,
            orchestrator: Arc::new(orchestrator),
            controller,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &NavigationStateStore {
        &self.store
    }

    pub fn current_location(&self) -> Location {
        self.location.current()
    }

    // === Registration ===

    pub fn register_resolver(&self, registration: ResolverRegistration) -> ResolverHandle {
        self.orchestrator.register(registration)
    }

    pub fn has_resolver(&self, pattern: &str) -> bool {
        self.orchestrator.registry().has_resolver(pattern)
    }

    pub fn get_registered_resolvers(&self) -> Vec<RegisteredResolver> {
        self.orchestrator.registry().list_all()
    }

    // === Parameters ===

    pub fn update_params(&self, updates: ParamUpdates, options: UpdateOptions) -> String {
        self.orchestrator.update_params(updates, options)
    }

    pub fn get_param(&self, key: &str) -> Option<ParamValue> {
        self.orchestrator.get_param(key)
    }

    pub fn get_params(&self) -> ParameterMap {
        self.orchestrator.get_params()
    }

    // === Resolution ===

    pub async fn resolve_current_route(&self) -> Vec<Resolution> {
        self.orchestrator.resolve_current_route().await
    }

    pub fn last_error(&self) -> Option<String> {
        self.orchestrator.last_error()
    }

    pub fn dropped_cycles(&self) -> u64 {
        self.orchestrator.dropped_cycles()
    }

    pub fn state(&self) -> RegistryState {
        self.orchestrator.state()
    }

    /// Forget everything remembered about earlier locations (logout)
    pub fn clear_all(&self) {
        self.store.clear_all();
        self.orchestrator.clear_snapshots();
    }

    // === Reconciliation loop ===

    /// Follow the location until its provider goes away.
    ///
    /// Each change is handed to the sync controller first, then a resolution
    /// cycle is started in the background. A cycle requested while another
    /// one is running is dropped.
    pub async fn run(&self) {
        let mut changes = self.location.subscribe();

        let initial = changes.borrow_and_update().clone();
        self.on_location_change(&initial);

        while changes.changed().await.is_ok() {
            let location = changes.borrow_and_update().clone();
            self.on_location_change(&location);
        }

        tracing::debug!("Location feed closed, navigator stopped");
    }

    fn on_location_change(&self, location: &Location) {
        if let Some(action) = self.controller.handle_change(location) {
            tracing::debug!(url = %action.url(), "Location rewritten by sync controller");
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            orchestrator.resolve_current_route().await;
        });
    }
}
