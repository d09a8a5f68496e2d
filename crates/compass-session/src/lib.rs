//! Compass Navigation State Store
//!
//! Session-lifetime memory of where the user has been:
//! - the raw query string last seen on every exact path
//! - the last full child location visited under each two-segment parent
//!
//! Both maps live in one JSON document under a namespaced key of the
//! durable store. Storage failures never reach the caller; the store
//! falls back to memory and keeps working.

mod error;
mod state;
mod store;

pub use error::SessionError;
pub use state::{PersistedState, StoredLocationParams};
pub use store::{NavigationStateStore, DEFAULT_STORAGE_KEY};

pub type Result<T> = std::result::Result<T, SessionError>;
