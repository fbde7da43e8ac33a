//! Ordered callback registries and the handles that detach them.

use crate::{
    event::TimedEvent,
    types::{DropCallback, MatchCallback},
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::{
    fmt,
    sync::{Arc, Weak},
};

/// An ordered list of connected slots.
///
/// Slots are kept in connection order. Invocation works on a snapshot
/// taken under a short lock, so a slot may connect or disconnect slots
/// on the same signal while it runs.
pub struct Signal<F> {
    registry: Arc<Mutex<Registry<F>>>,
}

struct Registry<F> {
    next_id: u64,
    slots: IndexMap<u64, F>,
}

impl<F> Default for Signal<F> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                slots: IndexMap::new(),
            })),
        }
    }
}

impl<F> Signal<F>
where
    F: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a slot and returns the handle that removes it.
    pub fn connect(&self, slot: F) -> Connection {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.slots.insert(id, slot);
            id
        };

        let registry: Weak<dyn Detach> = Arc::downgrade(&self.registry) as Weak<dyn Detach>;
        Connection { id, registry }
    }

    /// The connected slots in connection order.
    pub fn snapshot(&self) -> Vec<F> {
        self.registry.lock().slots.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
    fn is_attached(&self, id: u64) -> bool;
}

impl<F> Detach for Mutex<Registry<F>>
where
    F: Send,
{
    fn detach(&self, id: u64) -> bool {
        self.lock().slots.shift_remove(&id).is_some()
    }

    fn is_attached(&self, id: u64) -> bool {
        self.lock().slots.contains_key(&id)
    }
}

/// A handle to a registered callback.
///
/// Dropping the handle leaves the callback connected.
pub struct Connection {
    id: u64,
    registry: Weak<dyn Detach>,
}

impl Connection {
    /// Removes the callback. Returns false if it was already removed
    /// or its owner is gone.
    pub fn disconnect(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.detach(self.id))
    }

    pub fn is_connected(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.is_attached(self.id))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Holds match and drop callbacks and invokes them in registration
/// order on the calling thread.
pub struct Dispatcher<M> {
    matches: Signal<MatchCallback<M>>,
    drops: Signal<DropCallback<M>>,
}

impl<M> Default for Dispatcher<M> {
    fn default() -> Self {
        Self {
            matches: Signal::default(),
            drops: Signal::default(),
        }
    }
}

impl<M> Dispatcher<M>
where
    M: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_match(&self, callback: MatchCallback<M>) -> Connection {
        self.matches.connect(callback)
    }

    pub fn register_drop(&self, callback: DropCallback<M>) -> Connection {
        self.drops.connect(callback)
    }

    pub fn dispatch_match(&self, group: &[TimedEvent<M>]) {
        for callback in self.matches.snapshot() {
            callback(group);
        }
    }

    /// Reports `event`, evicted from `channel`, in an otherwise empty
    /// tuple of `channels` slots.
    pub fn dispatch_drop(&self, channel: usize, channels: usize, event: TimedEvent<M>) {
        let callbacks = self.drops.snapshot();
        if callbacks.is_empty() {
            return;
        }

        let mut slots = vec![None; channels];
        slots[channel] = Some(event);

        for callback in callbacks {
            callback(&slots);
        }
    }
}
