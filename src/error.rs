//! Error types for the synchronization core.
//!
//! [`SyncError`] is the central error type. Each variant carries a stable
//! numeric code so that surrounding application code (request handlers,
//! push channels) can report failures without matching on message text.

/// Error returned by a caller-supplied decode function.
///
/// The cache never inspects or rewrites it; it reaches the caller of
/// `get`/`get_many` wrapped in [`SyncError::Decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Creates a decode error with a free-form message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// A required field was absent from the hash.
    #[must_use]
    pub fn missing_field(field: &str) -> Self {
        Self::new(format!("missing field `{field}`"))
    }

    /// A field was present but its value could not be interpreted.
    #[must_use]
    pub fn invalid_field(field: &str, value: &str) -> Self {
        Self::new(format!("invalid value {value:?} for field `{field}`"))
    }

    /// Returns the message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error enum for every fallible operation of the core.
///
/// # Error Code Ranges
///
/// | Range     | Category                 |
/// |-----------|--------------------------|
/// | 1000–1999 | Caller misuse            |
/// | 2000–2999 | Not found                |
/// | 3000–3999 | Store                    |
/// | 4000–4999 | Collaborator (decode, listener) |
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Key is not a member of the container's set.
    #[error("key {key} is not a member of {set}")]
    NotFound {
        /// Set identifier of the container.
        set: String,
        /// Requested key.
        key: String,
    },

    /// The caller's decode function rejected a hash.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The store could not be reached or the request failed in transport.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The value stored under a key does not have the expected shape.
    #[error("malformed value at {key}: {reason}")]
    MalformedHash {
        /// Offending key.
        key: String,
        /// Store-provided description.
        reason: String,
    },

    /// Attempted to remove a listener that is not registered.
    #[error("listener not registered for event type {0:?}")]
    InvalidListener(String),

    /// Attempted to finish a task that is not tracked.
    #[error("task not tracked: {0}")]
    InvalidTask(String),

    /// A listener failed during dispatch.
    #[error(transparent)]
    Listener(#[from] anyhow::Error),
}

impl SyncError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidListener(_) => 1001,
            Self::InvalidTask(_) => 1002,
            Self::NotFound { .. } => 2001,
            Self::StoreUnavailable(_) => 3001,
            Self::MalformedHash { .. } => 3002,
            Self::Decode(_) => 4001,
            Self::Listener(_) => 4002,
        }
    }

    /// Returns `true` for errors raised by the store rather than by the
    /// caller or a collaborator.
    #[must_use]
    pub const fn is_store_error(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::MalformedHash { .. })
    }
}
