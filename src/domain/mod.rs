//! Domain layer: identity cache, containers, join coordination and events.
//!
//! This module holds the synchronization core. Objects are resolved through
//! the [`ObjectCache`], collections are exposed as [`Container`] views over
//! store sets, batches of asynchronous work are joined with a
//! [`JoinCoordinator`], and state changes are announced through the
//! [`EventTarget`] capability.

pub mod container;
pub mod event;
pub mod event_target;
pub mod join;
pub mod object_cache;
pub mod task_id;

pub use container::Container;
pub use event::Event;
pub use event_target::{EventTarget, Listener, ListenerRegistry, listener};
pub use join::JoinCoordinator;
pub use object_cache::{DecodeFn, ObjectCache};
pub use task_id::TaskId;
