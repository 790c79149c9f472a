//! Synchronous string key/value persistence.

use crate::error::Result;

/// Durable string store keyed by name.
///
/// Writes are synchronous so a caller can persist each transcript mutation
/// before observers see the next one.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never set or was removed.
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
