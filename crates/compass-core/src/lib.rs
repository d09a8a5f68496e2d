//! Compass Core
//!
//! Entry point for hosts: configuration, logging and the `Navigator`
//! facade that owns the registry, orchestrator, state store and sync
//! controller for one application instance.

mod config;
mod error;
mod navigator;

pub use config::{Config, DEFAULT_LOG_FILTER};
pub use error::CoreError;
pub use navigator::{open_store, Navigator};

// Re-export component APIs
pub use compass_resolver::{
    MatchKind, ParamUpdates, RegisteredResolver, RegistryState, Resolution, ResolutionPhase,
    ResolveContext, ResolverError, ResolverHandle, ResolverRegistration, UpdateOptions,
};
pub use compass_routing::{
    DecodeOptions, Location, LocationProvider, MemoryLocation, ParamValue, ParameterMap,
};
pub use compass_session::{NavigationStateStore, PersistedState, StoredLocationParams};
pub use compass_storage::{Database, KeyValueStore, MemoryStore, SqliteStore, StorageError};
pub use compass_sync::{LocationSyncController, RestoreAction};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging with the default filter
pub fn init_logging() {
    init_logging_with(DEFAULT_LOG_FILTER);
}

/// Initialize logging; `RUST_LOG` takes precedence over `default_filter`
pub fn init_logging_with(default_filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if fmt().with_env_filter(filter).with_target(true).try_init().is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
