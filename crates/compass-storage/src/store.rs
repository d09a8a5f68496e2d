//! Durable store provider contract

use crate::Result;

/// Synchronous get/set/remove over string values.
///
/// Implementations must be cheap to call from an event-loop thread; values
/// are JSON documents produced by the caller.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;
}
