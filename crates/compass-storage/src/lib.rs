//! Compass Storage Layer
//!
//! Durable key-value persistence for navigation state.
//! Values are opaque JSON strings; every key lives inside a session scope
//! so that a new browser session starts from an empty view of the store.

mod database;
mod error;
mod memory;
mod migrations;
mod store;

pub use database::{Database, SqliteStore};
pub use error::StorageError;
pub use memory::MemoryStore;
pub use store::KeyValueStore;

pub type Result<T> = std::result::Result<T, StorageError>;
