//! In-process key-value store.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{Hash, KeyValueStore};
use crate::error::SyncError;

/// Value held under one key.
#[derive(Debug, Clone)]
enum Value {
    Hash(Hash),
    Set(BTreeSet<String>),
}

impl Value {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Hash(_) => "hash",
            Self::Set(_) => "set",
        }
    }
}

/// In-memory store with Redis-like key semantics.
///
/// Hashes and sets share one key namespace; reading a key through the
/// wrong type is a [`SyncError::MalformedHash`]. Empty hashes and sets are
/// removed, as Redis does.
///
/// Two hooks exist for tests: [`MemoryStore::fetch_count`] counts hash
/// fetches, and [`MemoryStore::set_available`] makes every call fail with
/// [`SyncError::StoreUnavailable`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Value>>,
    fetches: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `fetch_hash` calls served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Simulates the store going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Removes every key.
    pub fn clear(&self) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn check_available(&self) -> Result<(), SyncError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn wrong_type(key: &str, expected: &str, found: &Value) -> SyncError {
        SyncError::MalformedHash {
            key: key.to_string(),
            reason: format!("expected {expected}, found {}", found.kind()),
        }
    }

    /// Runs `f` against the set at `set`, or against `None` if absent.
    fn read_set<R>(
        &self,
        set: &str,
        f: impl FnOnce(Option<&BTreeSet<String>>) -> R,
    ) -> Result<R, SyncError> {
        self.check_available()?;
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        match data.get(set) {
            None => Ok(f(None)),
            Some(Value::Set(members)) => Ok(f(Some(members))),
            Some(other) => Err(Self::wrong_type(set, "set", other)),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn fetch_hash(&self, key: &str) -> Result<Option<Hash>, SyncError> {
        self.check_available()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        match data.get(key) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(Some(hash.clone())),
            Some(other) => Err(Self::wrong_type(key, "hash", other)),
        }
    }

    async fn is_member(&self, set: &str, member: &str) -> Result<bool, SyncError> {
        self.read_set(set, |members| members.is_some_and(|m| m.contains(member)))
    }

    async fn cardinality(&self, set: &str) -> Result<usize, SyncError> {
        self.read_set(set, |members| members.map_or(0, BTreeSet::len))
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, SyncError> {
        self.read_set(set, |members| {
            members.map_or_else(Vec::new, |m| m.iter().cloned().collect())
        })
    }

    async fn put_hash(&self, key: &str, hash: &Hash) -> Result<(), SyncError> {
        self.check_available()?;
        if hash.is_empty() {
            return Ok(());
        }
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(Hash::new()))
        {
            Value::Hash(existing) => {
                existing.extend(hash.iter().map(|(k, v)| (k.clone(), v.clone())));
                Ok(())
            }
            other => Err(Self::wrong_type(key, "hash", other)),
        }
    }

    async fn add_member(&self, set: &str, member: &str) -> Result<bool, SyncError> {
        self.check_available()?;
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        match data
            .entry(set.to_string())
            .or_insert_with(|| Value::Set(BTreeSet::new()))
        {
            Value::Set(members) => Ok(members.insert(member.to_string())),
            other => Err(Self::wrong_type(set, "set", other)),
        }
    }

    async fn remove_member(&self, set: &str, member: &str) -> Result<bool, SyncError> {
        self.check_available()?;
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let removed = match data.get_mut(set) {
            None => return Ok(false),
            Some(Value::Set(members)) => members.remove(member),
            Some(other) => return Err(Self::wrong_type(set, "set", other)),
        };
        if matches!(data.get(set), Some(Value::Set(members)) if members.is_empty()) {
            data.remove(set);
        }
        Ok(removed)
    }

    async fn delete(&self, key: &str) -> Result<bool, SyncError> {
        self.check_available()?;
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        Ok(data.remove(key).is_some())
    }
}
