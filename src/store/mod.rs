//! Key-value store boundary.
//!
//! Domain objects live in the store as hashes (field name → scalar) and
//! collections as sets of keys. [`KeyValueStore`] is the only surface the
//! rest of the crate talks to; [`MemoryStore`] backs tests and embedding,
//! [`RedisStore`] talks to a Redis server.

pub mod memory;
pub mod redis;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::error::SyncError;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Field name → scalar mapping stored against one key.
pub type Hash = HashMap<String, String>;

/// Asynchronous access to hashes and sets in a key-value store.
///
/// Implementations must uphold:
/// - A key that does not exist yields `Ok(None)` / `false` / `0` / empty,
///   never an error.
/// - A key holding a value of the wrong type yields
///   [`SyncError::MalformedHash`].
/// - Transport failures yield [`SyncError::StoreUnavailable`].
#[async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Fetches every field of the hash at `key`.
    async fn fetch_hash(&self, key: &str) -> Result<Option<Hash>, SyncError>;

    /// Returns `true` if `member` belongs to the set at `set`.
    async fn is_member(&self, set: &str, member: &str) -> Result<bool, SyncError>;

    /// Returns the cardinality of the set at `set`.
    async fn cardinality(&self, set: &str) -> Result<usize, SyncError>;

    /// Returns all members of the set at `set`, in no particular order.
    async fn members(&self, set: &str) -> Result<Vec<String>, SyncError>;

    /// Writes the given fields into the hash at `key`, creating it if needed.
    async fn put_hash(&self, key: &str, hash: &Hash) -> Result<(), SyncError>;

    /// Adds `member` to the set at `set`. Returns `true` if it was not
    /// already present.
    async fn add_member(&self, set: &str, member: &str) -> Result<bool, SyncError>;

    /// Removes `member` from the set at `set`. Returns `true` if it was
    /// present.
    async fn remove_member(&self, set: &str, member: &str) -> Result<bool, SyncError>;

    /// Deletes whatever is stored at `key`. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> Result<bool, SyncError>;
}
