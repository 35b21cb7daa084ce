//! Synchronous publish/subscribe attachable to any object.
//!
//! A type becomes an event target by embedding a [`ListenerRegistry`] and
//! implementing [`EventTarget::event_listeners`]; registration, removal and
//! dispatch come as provided methods.
//!
//! The registry holds listeners weakly. Callers keep the [`Listener`]
//! handle alive for as long as they want to be notified; dropping it ends
//! the subscription without an explicit removal.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use super::Event;
use crate::error::SyncError;

/// Listener callable for events dispatched by an `S`.
pub type ListenerFn<S> = dyn Fn(&Event<'_, S>) -> anyhow::Result<()> + Send + Sync;

/// Shared handle to a listener. Identity is the allocation: registering a
/// clone of the same handle twice is a no-op.
pub type Listener<S> = Arc<ListenerFn<S>>;

/// Wraps a closure into a [`Listener`].
pub fn listener<S, F>(f: F) -> Listener<S>
where
    F: Fn(&Event<'_, S>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn identity<S>(listener: &Listener<S>) -> usize {
    Arc::as_ptr(listener).cast::<()>() as usize
}

/// Per-object table of event type → listeners.
///
/// Listeners of one type are kept in a hash map keyed by identity, so the
/// order in which they are invoked is unspecified.
pub struct ListenerRegistry<S> {
    by_type: RwLock<HashMap<String, HashMap<usize, Weak<ListenerFn<S>>>>>,
}

impl<S> Default for ListenerRegistry<S> {
    fn default() -> Self {
        Self {
            by_type: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> fmt::Debug for ListenerRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.by_type.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_map()
            .entries(map.iter().map(|(event_type, listeners)| (event_type, listeners.len())))
            .finish()
    }
}

impl<S> ListenerRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event_type`. Returns `false` if it was
    /// already registered.
    pub fn add(&self, event_type: &str, listener: &Listener<S>) -> bool {
        let mut map = self.by_type.write().unwrap_or_else(PoisonError::into_inner);
        let listeners = map.entry(event_type.to_string()).or_default();
        listeners.retain(|_, weak| weak.strong_count() > 0);
        let id = identity(listener);
        if listeners.contains_key(&id) {
            return false;
        }
        listeners.insert(id, Arc::downgrade(listener));
        tracing::debug!(event_type, "listener registered");
        true
    }

    /// Unregisters `listener` from `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidListener`] if `listener` is not
    /// registered for `event_type`.
    pub fn remove(&self, event_type: &str, listener: &Listener<S>) -> Result<(), SyncError> {
        let mut map = self.by_type.write().unwrap_or_else(PoisonError::into_inner);
        let removed = map
            .get_mut(event_type)
            .and_then(|listeners| listeners.remove(&identity(listener)))
            .is_some_and(|weak| weak.strong_count() > 0);
        if map.get(event_type).is_some_and(HashMap::is_empty) {
            map.remove(event_type);
        }
        if !removed {
            return Err(SyncError::InvalidListener(event_type.to_string()));
        }
        tracing::debug!(event_type, "listener removed");
        Ok(())
    }

    /// Live listeners for `event_type` at this instant.
    #[must_use]
    pub fn snapshot(&self, event_type: &str) -> Vec<Listener<S>> {
        let map = self.by_type.read().unwrap_or_else(PoisonError::into_inner);
        map.get(event_type)
            .map(|listeners| listeners.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Number of live listeners for `event_type`.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        let map = self.by_type.read().unwrap_or_else(PoisonError::into_inner);
        map.get(event_type).map_or(0, |listeners| {
            listeners
                .values()
                .filter(|weak| weak.strong_count() > 0)
                .count()
        })
    }
}

/// Capability to dispatch [`Event`]s to registered listeners.
pub trait EventTarget: Sized {
    /// Registry this object dispatches from.
    fn event_listeners(&self) -> &ListenerRegistry<Self>;

    /// Registers `listener` for `event_type`. Registering the same listener
    /// twice has no further effect; returns `false` in that case.
    fn add_event_listener(&self, event_type: &str, listener: &Listener<Self>) -> bool {
        self.event_listeners().add(event_type, listener)
    }

    /// Unregisters `listener` from `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidListener`] if `listener` is not
    /// registered for `event_type`.
    fn remove_event_listener(
        &self,
        event_type: &str,
        listener: &Listener<Self>,
    ) -> Result<(), SyncError> {
        self.event_listeners().remove(event_type, listener)
    }

    /// Sets `self` as the event source and synchronously invokes every
    /// listener registered for the event type.
    ///
    /// Listeners run outside the registry lock and may register, remove or
    /// dispatch on this object.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Listener`] with the first listener error. The
    /// remaining listeners are not invoked.
    fn dispatch_event<'a>(&'a self, mut event: Event<'a, Self>) -> Result<(), SyncError> {
        event.set_source(self);
        let listeners = self.event_listeners().snapshot(event.event_type());
        tracing::trace!(
            event_type = event.event_type(),
            listeners = listeners.len(),
            "dispatching event"
        );
        for callback in listeners {
            callback(&event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Ship {
        name: String,
        listeners: ListenerRegistry<Ship>,
    }

    impl EventTarget for Ship {
        fn event_listeners(&self) -> &ListenerRegistry<Self> {
            &self.listeners
        }
    }

    impl Ship {
        fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                listeners: ListenerRegistry::new(),
            }
        }

        fn fire(&self, weapon: &str) -> Result<(), SyncError> {
            self.dispatch_event(Event::new("fired").with_arg("weapon", weapon))
        }
    }

    /// What a recording listener saw: source address, source name, `weapon`.
    type Seen = Arc<Mutex<Vec<(Option<usize>, Option<String>, Option<String>)>>>;

    fn recorder() -> (Listener<Ship>, Seen) {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        let l = listener(move |event: &Event<'_, Ship>| {
            let source = event.source();
            sink.lock().unwrap_or_else(PoisonError::into_inner).push((
                source.map(|s| std::ptr::from_ref(s) as usize),
                source.map(|s| s.name.clone()),
                event
                    .arg("weapon")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            ));
            Ok(())
        });
        (l, seen)
    }

    fn seen_len(seen: &Seen) -> usize {
        seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[test]
    fn dispatch_without_listeners_is_noop() {
        let ship = Ship::named("agamemnon");
        assert!(ship.fire("plasma").is_ok());
    }

    #[test]
    fn dispatch_reaches_listener_with_source_and_args() {
        let ship = Ship::named("agamemnon");
        let (fired, seen) = recorder();
        assert!(ship.add_event_listener("fired", &fired));
        assert!(ship.fire("plasma").is_ok());

        let seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
        let [(Some(addr), Some(name), Some(weapon))] = seen.as_slice() else {
            panic!("expected exactly one complete record, got {seen:?}");
        };
        assert_eq!(*addr, std::ptr::from_ref(&ship) as usize);
        assert_eq!(name, "agamemnon");
        assert_eq!(weapon, "plasma");
    }

    #[test]
    fn dispatch_keeps_creation_timestamp() {
        let ship = Ship::named("agamemnon");
        let stamps: Arc<Mutex<Vec<chrono::DateTime<chrono::Utc>>>> = Arc::default();
        let sink = Arc::clone(&stamps);
        let stamp = listener(move |event: &Event<'_, Ship>| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.timestamp());
            Ok(())
        });
        ship.add_event_listener("fired", &stamp);

        let event = Event::new("fired");
        let created = event.timestamp();
        assert!(ship.dispatch_event(event).is_ok());
        let stamps = stamps.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(stamps.as_slice(), [created]);
    }

    #[test]
    fn duplicate_registration_is_idempotent() {
        let ship = Ship::named("agamemnon");
        let (fired, seen) = recorder();
        assert!(ship.add_event_listener("fired", &fired));
        assert!(!ship.add_event_listener("fired", &Arc::clone(&fired)));
        assert_eq!(ship.event_listeners().count("fired"), 1);

        assert!(ship.fire("plasma").is_ok());
        assert_eq!(seen_len(&seen), 1);
    }

    #[test]
    fn removed_listener_is_not_invoked() {
        let ship = Ship::named("agamemnon");
        let (fired, seen) = recorder();
        ship.add_event_listener("fired", &fired);
        assert!(ship.remove_event_listener("fired", &fired).is_ok());
        assert!(ship.fire("plasma").is_ok());
        assert_eq!(seen_len(&seen), 0);
    }

    #[test]
    fn removing_unknown_listener_fails() {
        let ship = Ship::named("agamemnon");
        let (fired, _seen) = recorder();
        let (other, _other_seen) = recorder();
        ship.add_event_listener("fired", &fired);

        let result = ship.remove_event_listener("fired", &other);
        assert!(matches!(result, Err(SyncError::InvalidListener(ref t)) if t == "fired"));
        let result = ship.remove_event_listener("docked", &fired);
        assert!(matches!(result, Err(SyncError::InvalidListener(_))));
    }

    #[test]
    fn listeners_are_per_type() {
        let ship = Ship::named("agamemnon");
        let (docked, seen) = recorder();
        ship.add_event_listener("docked", &docked);
        assert!(ship.fire("plasma").is_ok());
        assert_eq!(seen_len(&seen), 0);

        assert!(ship.dispatch_event(Event::new("docked")).is_ok());
        assert_eq!(seen_len(&seen), 1);
    }

    #[test]
    fn dropped_listener_is_skipped() {
        let ship = Ship::named("agamemnon");
        let (fired, seen) = recorder();
        ship.add_event_listener("fired", &fired);
        drop(fired);

        assert_eq!(ship.event_listeners().count("fired"), 0);
        assert!(ship.fire("plasma").is_ok());
        assert_eq!(seen_len(&seen), 0);
    }

    #[test]
    fn listener_error_propagates() {
        let ship = Ship::named("agamemnon");
        let failing = listener(|_: &Event<'_, Ship>| Err(anyhow::anyhow!("shields down")));
        ship.add_event_listener("fired", &failing);

        let Err(err) = ship.fire("plasma") else {
            panic!("expected listener error");
        };
        assert!(matches!(err, SyncError::Listener(_)));
        assert_eq!(err.to_string(), "shields down");
    }

    #[test]
    fn listener_may_dispatch_on_source() {
        let ship = Ship::named("agamemnon");
        let (reloaded, seen) = recorder();
        let chain = listener(|event: &Event<'_, Ship>| {
            let Some(source) = event.source() else {
                anyhow::bail!("event without source");
            };
            source.dispatch_event(Event::new("reloaded"))?;
            Ok(())
        });
        ship.add_event_listener("fired", &chain);
        ship.add_event_listener("reloaded", &reloaded);

        assert!(ship.fire("plasma").is_ok());
        assert_eq!(seen_len(&seen), 1);
    }
}
