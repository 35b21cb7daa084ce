//! Read-only mapping view over a named set in the store.
//!
//! [`Container`] answers "what belongs to this collection" from the set's
//! membership and "what does a member look like" through the shared
//! [`ObjectCache`], so containers over overlapping sets hand out the same
//! object instances.

use std::collections::HashMap;
use std::sync::Arc;

use super::ObjectCache;
use crate::error::SyncError;

/// Set-backed key → object mapping.
///
/// Every read goes to the store; the container keeps no state beyond the
/// set identifier. Key listings are snapshots taken at call time.
#[derive(Debug)]
pub struct Container<T> {
    cache: Arc<ObjectCache<T>>,
    set: String,
}

impl<T> Clone for Container<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            set: self.set.clone(),
        }
    }
}

impl<T> Container<T> {
    /// Creates a view over the set named `set`.
    #[must_use]
    pub fn new(cache: Arc<ObjectCache<T>>, set: impl Into<String>) -> Self {
        Self {
            cache,
            set: set.into(),
        }
    }

    /// Returns the set identifier.
    #[must_use]
    pub fn set_name(&self) -> &str {
        &self.set
    }

    /// Returns the shared object cache values are resolved through.
    #[must_use]
    pub fn cache(&self) -> &Arc<ObjectCache<T>> {
        &self.cache
    }

    /// Returns `true` if `key` is a member of the set.
    ///
    /// # Errors
    ///
    /// Returns a store error if the membership test fails.
    pub async fn contains(&self, key: &str) -> Result<bool, SyncError> {
        self.cache.store().is_member(&self.set, key).await
    }

    /// Gets the object for member `key`.
    ///
    /// Returns `Ok(None)` when `key` is a member but no hash is stored for
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if `key` is not a member of the set,
    /// without consulting the object cache. Fetch and decode errors from the
    /// cache are passed through.
    pub async fn get(&self, key: &str) -> Result<Option<Arc<T>>, SyncError> {
        if !self.contains(key).await? {
            return Err(SyncError::NotFound {
                set: self.set.clone(),
                key: key.to_string(),
            });
        }
        let object = self.cache.get(key).await?;
        if object.is_none() {
            tracing::debug!(set = %self.set, key, "member has no stored hash");
        }
        Ok(object)
    }

    /// Returns the cardinality of the set.
    ///
    /// # Errors
    ///
    /// Returns a store error if the request fails.
    pub async fn len(&self) -> Result<usize, SyncError> {
        self.cache.store().cardinality(&self.set).await
    }

    /// Returns `true` if the set has no members.
    ///
    /// # Errors
    ///
    /// Returns a store error if the request fails.
    pub async fn is_empty(&self) -> Result<bool, SyncError> {
        Ok(self.len().await? == 0)
    }

    /// Returns the current members of the set.
    ///
    /// # Errors
    ///
    /// Returns a store error if the request fails.
    pub async fn keys(&self) -> Result<Vec<String>, SyncError> {
        self.cache.store().members(&self.set).await
    }

    /// Returns an iterator over a snapshot of the members.
    ///
    /// Later changes to the set are not reflected.
    ///
    /// # Errors
    ///
    /// Returns a store error if the request fails.
    pub async fn iter_keys(&self) -> Result<std::vec::IntoIter<String>, SyncError> {
        Ok(self.keys().await?.into_iter())
    }

    /// Returns `(key, object)` pairs for a snapshot of the members.
    ///
    /// Members without a stored hash pair with `None`. A member removed
    /// between the snapshot and value resolution still resolves through the
    /// cache; no membership re-check is made.
    ///
    /// # Errors
    ///
    /// Returns the first store or decode error encountered.
    pub async fn items(&self) -> Result<Vec<(String, Option<Arc<T>>)>, SyncError> {
        let keys = self.keys().await?;
        let values = self.cache.get_many(keys.as_slice()).await?;
        Ok(keys.into_iter().zip(values).collect())
    }

    /// Materialises the container as a map of members with stored objects.
    ///
    /// # Errors
    ///
    /// Returns the first store or decode error encountered.
    pub async fn to_map(&self) -> Result<HashMap<String, Arc<T>>, SyncError> {
        Ok(self
            .items()
            .await?
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::store::{Hash, KeyValueStore, MemoryStore};
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, PartialEq, Eq)]
    struct Ship {
        kind: String,
    }

    fn decode(hash: Hash) -> Result<Ship, DecodeError> {
        let kind = hash
            .get("type")
            .cloned()
            .ok_or_else(|| DecodeError::missing_field("type"))?;
        Ok(Ship { kind })
    }

    async fn fixture() -> (Arc<MemoryStore>, Container<Ship>) {
        let store = Arc::new(MemoryStore::new());
        for (key, kind) in [("ship:0", "starfury"), ("ship:1", "frazi")] {
            let hash = Hash::from([("type".to_string(), kind.to_string())]);
            assert_ok!(store.put_hash(key, &hash).await);
            assert_ok!(store.add_member("ships", key).await);
        }
        let dyn_store: Arc<dyn KeyValueStore> = Arc::clone(&store) as Arc<dyn KeyValueStore>;
        let cache = Arc::new(ObjectCache::new(dyn_store, decode));
        (store, Container::new(cache, "ships"))
    }

    #[tokio::test]
    async fn keys_lists_members() {
        let (_store, ships) = fixture().await;
        let mut keys = assert_ok!(ships.keys().await);
        keys.sort();
        assert_eq!(keys, vec!["ship:0".to_string(), "ship:1".to_string()]);

        let iterated: Vec<String> = assert_ok!(ships.iter_keys().await).collect();
        assert_eq!(iterated.len(), 2);
    }

    #[tokio::test]
    async fn get_resolves_member() {
        let (_store, ships) = fixture().await;
        let Ok(Some(ship)) = ships.get("ship:0").await else {
            panic!("expected ship:0");
        };
        assert_eq!(ship.kind, "starfury");
    }

    #[tokio::test]
    async fn len_and_contains() {
        let (_store, ships) = fixture().await;
        assert_eq!(ships.len().await.ok(), Some(2));
        assert_eq!(ships.is_empty().await.ok(), Some(false));
        assert_eq!(ships.contains("ship:0").await.ok(), Some(true));
        assert_eq!(ships.contains("foo").await.ok(), Some(false));
    }

    #[tokio::test]
    async fn non_member_is_not_found_without_fetch() {
        let (store, ships) = fixture().await;
        let err = assert_err!(ships.get("foo").await);
        assert!(matches!(err, SyncError::NotFound { ref key, .. } if key == "foo"));
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn member_without_hash_is_none() {
        let (store, ships) = fixture().await;
        assert_ok!(store.add_member("ships", "ship:9").await);
        let result = assert_ok!(ships.get("ship:9").await);
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn overlapping_containers_share_instances() {
        let (store, ships) = fixture().await;
        assert_ok!(store.add_member("fleet", "ship:1").await);
        let fleet = Container::new(Arc::clone(ships.cache()), "fleet");

        let Ok(Some(a)) = ships.get("ship:1").await else {
            panic!("expected ship:1 in ships");
        };
        let Ok(Some(b)) = fleet.get("ship:1").await else {
            panic!("expected ship:1 in fleet");
        };
        assert!(Arc::ptr_eq(&a, &b));
        assert!(matches!(
            fleet.get("ship:0").await,
            Err(SyncError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn items_and_to_map() {
        let (store, ships) = fixture().await;
        assert_ok!(store.add_member("ships", "ship:9").await);

        let items = assert_ok!(ships.items().await);
        assert_eq!(items.len(), 3);
        assert_eq!(items.iter().filter(|(_, v)| v.is_none()).count(), 1);

        let map = assert_ok!(ships.to_map().await);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("ship:1").map(|s| s.kind.as_str()), Some("frazi"));
    }

    #[tokio::test]
    async fn empty_set() {
        let (_store, ships) = fixture().await;
        let empty = Container::new(Arc::clone(ships.cache()), "nothing");
        assert_eq!(empty.len().await.ok(), Some(0));
        assert_eq!(empty.is_empty().await.ok(), Some(true));
        assert!(assert_ok!(empty.keys().await).is_empty());
        assert_eq!(empty.set_name(), "nothing");
    }
}
