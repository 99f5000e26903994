//! Change-notification dispatch with recursion protection.
//!
//! Listeners react to preset changes and frequently change presets
//! themselves (e.g. a follower framework re-synchronizing an entity when
//! told about it). Without protection that re-entry loops forever. The
//! dispatcher borrows the registry's per-entity in-flight bit as the
//! guard: a dispatch that observes the bit already set returns silently.

use crate::id::EntityId;
use crate::registry::{EntityRegistry, EntityState};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::Arc;

/// Snapshot describing one preset change. Built once per dispatch, before
/// any listener runs; mutations made by listeners never refresh it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetChange {
    /// Name of the newly applied preset, when one was applied.
    pub preset_name: Option<String>,
    /// The change removed the entity's assignment rather than replacing it.
    pub unassigned: bool,
}

/// Receives change notifications. Implementations may call back into the
/// dispatcher (nested dispatch for another entity is fine, and a nested
/// dispatch for the *same* entity is swallowed by the guard), but must not
/// register or deregister listeners from inside the callback.
pub trait ChangeListener: Send + Sync {
    fn on_preset_changed(&self, entity: EntityId, change: &PresetChange);
}

/// Fans preset-change notifications out to registered listeners.
///
/// The listener list sits behind a reentrant lock so a listener that
/// triggers a nested dispatch on its own thread does not deadlock, while
/// other threads cannot mutate the list mid-iteration. The inner
/// `RefCell` panics if a listener violates the no-mutation-during-dispatch
/// contract, which beats corrupting the iteration.
#[derive(Default)]
pub struct ChangeDispatcher {
    listeners: ReentrantMutex<RefCell<Vec<Arc<dyn ChangeListener>>>>,
}

impl ChangeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. Listeners are invoked in registration order.
    /// Registering the same `Arc` twice is a no-op.
    pub fn register(&self, listener: Arc<dyn ChangeListener>) {
        let guard = self.listeners.lock();
        let mut list = guard.borrow_mut();
        if list.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return;
        }
        list.push(listener);
    }

    /// Remove a listener by identity. Returns whether it was registered.
    pub fn deregister(&self, listener: &Arc<dyn ChangeListener>) -> bool {
        let guard = self.listeners.lock();
        let mut list = guard.borrow_mut();
        let before = list.len();
        list.retain(|l| !Arc::ptr_eq(l, listener));
        before != list.len()
    }

    pub fn is_registered(&self, listener: &Arc<dyn ChangeListener>) -> bool {
        let guard = self.listeners.lock();
        let registered = guard.borrow().iter().any(|l| Arc::ptr_eq(l, listener));
        registered
    }

    pub fn listener_count(&self) -> usize {
        let guard = self.listeners.lock();
        let count = guard.borrow().len();
        count
    }

    /// Notify all listeners that `entity`'s preset changed.
    ///
    /// `build_change` runs exactly once, before the first listener, and
    /// only if the dispatch actually proceeds; every listener sees that
    /// one frozen snapshot. If a notification for `entity` is already in
    /// flight on any thread (including this one, via a listener callback)
    /// the call returns without building the payload or invoking anyone.
    pub fn dispatch<F>(&self, registry: &EntityRegistry, entity: EntityId, build_change: F)
    where
        F: FnOnce() -> PresetChange,
    {
        let guard = self.listeners.lock();
        if guard.borrow().is_empty() {
            return;
        }

        // Check-and-set under the entry lock: only one dispatch per entity
        // can win, no matter how callers interleave.
        let mut engaged = false;
        registry.emplace_or_visit(entity, EntityState::new(), |state| {
            if !state.in_flight() {
                state.set_in_flight(true);
                engaged = true;
            }
        });
        if !engaged {
            return;
        }

        let change = build_change();
        {
            // Shared borrow held across the iteration: nested dispatch on
            // this thread re-borrows shared (fine), while register or
            // deregister from inside a callback hits a mutable borrow and
            // panics instead of corrupting the walk.
            let list = guard.borrow();
            for listener in list.iter() {
                listener.on_preset_changed(entity, &change);
            }
        }

        registry.visit(entity, |state| state.set_in_flight(false));
    }
}
