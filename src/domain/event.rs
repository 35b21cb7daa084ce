//! Events dispatched through an [`super::EventTarget`].
//!
//! An [`Event`] is built per dispatch: a type string, free-form arguments,
//! and the dispatching object, which [`super::EventTarget::dispatch_event`]
//! fills in.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A state-change notification.
///
/// `S` is the type of the dispatching object. The source is borrowed for
/// the duration of the dispatch only; listeners that need it later must
/// keep their own handle to the object.
#[derive(Debug, Clone)]
pub struct Event<'a, S> {
    event_type: String,
    source: Option<&'a S>,
    args: Map<String, Value>,
    timestamp: DateTime<Utc>,
}

impl<'a, S> Event<'a, S> {
    /// Creates an event of the given type with no arguments and no source.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source: None,
            args: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Adds (or replaces) one argument.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Merges a set of arguments; later keys replace earlier ones.
    #[must_use]
    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args.extend(args);
        self
    }

    /// Event type used to select listeners.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Object that dispatched the event, once dispatched.
    #[must_use]
    pub const fn source(&self) -> Option<&'a S> {
        self.source
    }

    /// All arguments.
    #[must_use]
    pub const fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// A single argument.
    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    /// Creation time.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub(crate) fn set_source(&mut self, source: &'a S) {
        self.source = Some(source);
    }
}

impl<S> fmt::Display for Event<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Event {}", self.event_type)?;
        if !self.args.is_empty() {
            write!(f, " {}", Value::Object(self.args.clone()))?;
        }
        write!(f, ">")
    }
}
