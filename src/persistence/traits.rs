//! The state store interface consumed by the scheduler.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::StateRecord;

/// Durable key/value persistence of last-observed state per watched
/// entity/source pair.
///
/// Writes keyed by `entity_key` are independent; the store only promises an
/// atomic upsert per key, which is what makes concurrent sweeps over disjoint
/// pairs safe without cross-pair locking.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Retrieves the state record for an entity key, or `None` if the pair
    /// has never been observed.
    async fn get(&self, entity_key: &str) -> Result<Option<StateRecord>, PersistenceError>;

    /// Atomically inserts or replaces the record for its entity key.
    async fn put(&self, record: &StateRecord) -> Result<(), PersistenceError>;

    /// Atomically clears all records. The only supported way to force full
    /// re-detection; the next poll cycle behaves like a first run for every
    /// pair.
    async fn reset(&self) -> Result<(), PersistenceError>;

    /// Lists all stored entity keys.
    async fn list_keys(&self) -> Result<Vec<String>, PersistenceError>;
}
