//! Redis-backed store over a multiplexed async connection.

use async_trait::async_trait;
use ::redis::AsyncCommands;
use ::redis::aio::MultiplexedConnection;

use super::{Hash, KeyValueStore};
use crate::error::SyncError;

/// [`KeyValueStore`] talking to a Redis server.
///
/// The multiplexed connection is cheap to clone; every call works on its
/// own clone so the store can be shared behind an `Arc` without locking.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    url: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").field("url", &self.url).finish()
    }
}

impl RedisStore {
    /// Opens a multiplexed connection to the server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] if the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        let client = ::redis::Client::open(url).map_err(|e| store_error(url, &e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| store_error(url, &e))?;
        tracing::info!(url, "connected to redis");
        Ok(Self {
            conn,
            url: url.to_string(),
        })
    }

    /// Returns the URL the store was opened with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Maps a Redis error on `key` to the crate error kinds.
fn store_error(key: &str, err: &::redis::RedisError) -> SyncError {
    if err.kind() == ::redis::ErrorKind::TypeError || err.code() == Some("WRONGTYPE") {
        SyncError::MalformedHash {
            key: key.to_string(),
            reason: err.to_string(),
        }
    } else {
        tracing::warn!(key, error = %err, "redis request failed");
        SyncError::StoreUnavailable(err.to_string())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn fetch_hash(&self, key: &str) -> Result<Option<Hash>, SyncError> {
        let mut conn = self.conn.clone();
        let hash: Hash = conn.hgetall(key).await.map_err(|e| store_error(key, &e))?;
        // HGETALL on a missing key replies with an empty map.
        Ok(if hash.is_empty() { None } else { Some(hash) })
    }

    async fn is_member(&self, set: &str, member: &str) -> Result<bool, SyncError> {
        let mut conn = self.conn.clone();
        conn.sismember(set, member)
            .await
            .map_err(|e| store_error(set, &e))
    }

    async fn cardinality(&self, set: &str) -> Result<usize, SyncError> {
        let mut conn = self.conn.clone();
        conn.scard(set).await.map_err(|e| store_error(set, &e))
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, SyncError> {
        let mut conn = self.conn.clone();
        conn.smembers(set).await.map_err(|e| store_error(set, &e))
    }

    async fn put_hash(&self, key: &str, hash: &Hash) -> Result<(), SyncError> {
        if hash.is_empty() {
            return Ok(());
        }
        let fields: Vec<(&str, &str)> = hash
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset_multiple(key, &fields)
            .await
            .map_err(|e| store_error(key, &e))?;
        Ok(())
    }

    async fn add_member(&self, set: &str, member: &str) -> Result<bool, SyncError> {
        let mut conn = self.conn.clone();
        let added: usize = conn
            .sadd(set, member)
            .await
            .map_err(|e| store_error(set, &e))?;
        Ok(added > 0)
    }

    async fn remove_member(&self, set: &str, member: &str) -> Result<bool, SyncError> {
        let mut conn = self.conn.clone();
        let removed: usize = conn
            .srem(set, member)
            .await
            .map_err(|e| store_error(set, &e))?;
        Ok(removed > 0)
    }

    async fn delete(&self, key: &str) -> Result<bool, SyncError> {
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(key).await.map_err(|e| store_error(key, &e))?;
        Ok(removed > 0)
    }
}
