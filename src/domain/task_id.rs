//! Handles for operations awaited by a [`super::JoinCoordinator`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A task is one store round trip or notification the caller has started
/// and not yet seen complete. The coordinator only compares handles, so a
/// random v4 UUID is enough to tell concurrent tasks apart; serialized it is
/// the bare hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(uuid::Uuid);

impl TaskId {
    /// Creates a new random handle.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// One handle per operation in a batch of `n`, ready to pass to
    /// [`super::JoinCoordinator::new`].
    #[must_use]
    pub fn batch(n: usize) -> Vec<Self> {
        (0..n).map(|_| Self::new()).collect()
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for TaskId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_distinct() {
        let ids = TaskId::batch(3);
        assert_eq!(ids.len(), 3);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 3);
        assert!(TaskId::batch(0).is_empty());
    }

    #[test]
    fn display_matches_uuid() {
        let uuid = uuid::Uuid::new_v4();
        let task = TaskId::from(uuid);
        assert_eq!(*task.as_uuid(), uuid);
        assert_eq!(task.to_string(), uuid.to_string());
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let task = TaskId::new();
        let Ok(json) = serde_json::to_string(&task) else {
            panic!("task id must serialize");
        };
        assert_eq!(json, format!("\"{task}\""));

        let Ok(back) = serde_json::from_str::<TaskId>(&json) else {
            panic!("task id must deserialize");
        };
        assert_eq!(back, task);
        assert!(serde_json::from_str::<TaskId>("\"not-a-uuid\"").is_err());
    }
}
