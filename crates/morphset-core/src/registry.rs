//! Concurrent per-entity state.
//!
//! Each tracked entity carries one 32-bit record packing its assigned
//! preset index together with a transient dispatch flag. The registry is
//! sharded by key: operations on different entities never block each
//! other, while operations on the same entity are mutually exclusive.

use crate::id::{EntityId, PresetIndex};
use dashmap::DashMap;

/// Bit-packed per-entity record.
///
/// Layout:
/// - bits 0..20 -- assigned preset index **plus one**; `0` means no preset
///   is assigned. The offset keeps the all-zero record meaningful as a
///   default, and shifts the storable ceiling down by one: the field holds
///   indexes up to `PresetIndex::MAX - 1` (the allocator never hands out
///   `MAX` itself).
/// - bits 20..31 -- reserved, always zero today.
/// - bit 31 -- a change notification is currently in flight for this
///   entity. Transient: never written to a save.
///
/// [`EntityState::PERSISTED_MASK`] names exactly the bits that survive a
/// save/restore round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityState {
    bits: u32,
}

impl EntityState {
    const INDEX_MASK: u32 = (1 << PresetIndex::BIT_WIDTH) - 1;
    const IN_FLIGHT_BIT: u32 = 1 << 31;

    /// Bits that survive a save/restore round trip.
    pub const PERSISTED_MASK: u32 = Self::INDEX_MASK;

    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a record from its persisted bits. Transient and reserved
    /// bits are dropped regardless of what the source stream held.
    pub fn from_persisted(bits: u32) -> Self {
        Self {
            bits: bits & Self::PERSISTED_MASK,
        }
    }

    /// The bits to write to a save.
    pub fn persisted_bits(self) -> u32 {
        self.bits & Self::PERSISTED_MASK
    }

    /// The assigned preset index, if any.
    pub fn preset_index(self) -> Option<PresetIndex> {
        let field = self.bits & Self::INDEX_MASK;
        if field == 0 {
            None
        } else {
            Some(PresetIndex(field - 1))
        }
    }

    /// Assign or clear the preset index field. Accepts indexes up to
    /// `PresetIndex::MAX - 1`; the +1 offset leaves no room for `MAX`.
    pub fn set_preset_index(&mut self, index: Option<PresetIndex>) {
        let field = match index {
            Some(index) => {
                debug_assert!(index.0 < PresetIndex::MAX, "index field overflow");
                index.0 + 1
            }
            None => 0,
        };
        self.bits = (self.bits & !Self::INDEX_MASK) | field;
    }

    pub fn in_flight(self) -> bool {
        self.bits & Self::IN_FLIGHT_BIT != 0
    }

    pub fn set_in_flight(&mut self, in_flight: bool) {
        if in_flight {
            self.bits |= Self::IN_FLIGHT_BIT;
        } else {
            self.bits &= !Self::IN_FLIGHT_BIT;
        }
    }
}

/// Concurrent mapping from entity to [`EntityState`].
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: DashMap<EntityId, EntityState>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to the existing record for `id`. No-op if absent.
    pub fn visit<F>(&self, id: EntityId, f: F)
    where
        F: FnOnce(&mut EntityState),
    {
        if let Some(mut entry) = self.entities.get_mut(&id) {
            f(entry.value_mut());
        }
    }

    /// Insert `default` if `id` has no record, then apply `f` to the
    /// record. The entry stays locked across both steps, so the
    /// check-and-set reads made inside `f` are atomic with the insert.
    pub fn emplace_or_visit<F>(&self, id: EntityId, default: EntityState, f: F)
    where
        F: FnOnce(&mut EntityState),
    {
        let mut entry = self.entities.entry(id).or_insert(default);
        f(entry.value_mut());
    }

    /// Point read. Copies the record out; the lock is not held after
    /// return, so the copy may be stale by the time the caller acts on it.
    pub fn get(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(&id).map(|entry| *entry.value())
    }

    /// Install a record verbatim (restore path).
    pub fn insert(&self, id: EntityId, state: EntityState) {
        self.entities.insert(id, state);
    }

    /// Iterate all records until `f` returns `false`. Returns `true` when
    /// the iteration ran to completion. Entries are locked one at a time;
    /// records added or removed concurrently may or may not be seen.
    pub fn for_each_while<F>(&self, mut f: F) -> bool
    where
        F: FnMut(EntityId, EntityState) -> bool,
    {
        for entry in self.entities.iter() {
            if !f(*entry.key(), *entry.value()) {
                return false;
            }
        }
        true
    }

    /// The assigned preset index of `id`, if tracked and assigned.
    pub fn preset_index(&self, id: EntityId) -> Option<PresetIndex> {
        self.get(id).and_then(EntityState::preset_index)
    }

    /// Assign or clear the preset index of `id`, creating the record on
    /// first assignment.
    pub fn set_preset(&self, id: EntityId, index: Option<PresetIndex>) {
        self.emplace_or_visit(id, EntityState::new(), |state| {
            state.set_preset_index(index);
        });
    }

    /// Clear the preset index of `id` without creating a record.
    pub fn clear_preset(&self, id: EntityId) {
        self.visit(id, |state| state.set_preset_index(None));
    }

    /// Drop all records (revert path).
    pub fn clear(&self) {
        self.entities.clear();
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
