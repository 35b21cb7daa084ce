//! # wall-state
//!
//! State-synchronization core of a small real-time backend.
//!
//! Domain objects are stored as hashes in a key-value store (Redis in
//! production) and mirrored into in-process objects. The crate guarantees a
//! single canonical instance per key while that instance is referenced,
//! exposes store sets as read-only mapping views, joins batches of
//! concurrent asynchronous operations, and provides synchronous
//! publish/subscribe for state-change notifications.
//!
//! ## Architecture
//!
//! ```text
//! Callers (request handlers, push channels)
//!     │
//!     ├── Container (domain/)          set membership → objects
//!     ├── EventTarget (domain/)        state-change notifications
//!     ├── JoinCoordinator (domain/)    fan-in of async work
//!     │
//!     ├── ObjectCache (domain/)        decode + weak identity cache
//!     │
//!     └── KeyValueStore (store/)       MemoryStore | RedisStore
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod store;
pub mod text;

pub use error::{DecodeError, SyncError};

/// Release identifier printed at startup.
pub const RELEASE: &str = env!("CARGO_PKG_VERSION");
