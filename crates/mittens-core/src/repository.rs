//! Persistence interface for local key-value storage.

use crate::error::Result;

/// A local key-value store holding serialized values under string keys.
///
/// This is the browser-`localStorage` shaped contract the transcript is
/// persisted through. No transactional guarantees are required; callers
/// write whole values and never read-modify-write across keys.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    ///
    /// - `Ok(Some(value))`: key present
    /// - `Ok(None)`: key absent
    /// - `Err(_)`: the backend could not be read
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
