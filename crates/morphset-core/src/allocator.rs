//! Stable preset-index allocation.
//!
//! The first time a preset name is seen in a category it is assigned the
//! category's next free index; the assignment is then permanent for the
//! lifetime of the save, surviving preset removal and reinstallation. The
//! save format stores these name-to-index maps (see `codec`), which is what
//! keeps entity bindings valid across save/load cycles.
//!
//! Each category also carries a sparse array mapping an index to the
//! position of its preset in the dense store, with a sentinel for indexes
//! whose preset is absent (removed, or reserved by the cross-category
//! mirroring step and never loaded there).

use crate::id::{Category, PresetIndex};
use std::collections::HashMap;

/// Sparse-array sentinel: this index has no preset in the dense store.
pub const SLOT_ABSENT: u32 = u32::MAX;

#[derive(Debug, Default)]
struct CategoryAllocator {
    /// Index assignment by exact name. Case-sensitive by design: this map
    /// exists for index assignment, not general lookups, which are
    /// case-insensitive and go through the store.
    index_by_name: HashMap<String, PresetIndex>,
    /// Next free index. Monotonically increasing, never decremented.
    next_index: u32,
    /// Position `i` holds the dense-store slot of the preset with index
    /// `i`, or `SLOT_ABSENT`. Length never shrinks and is kept at or above
    /// `next_index`. Expected to be very dense, so an array beats a
    /// hashtable here in both memory and lookup cost.
    dense_by_index: Vec<u32>,
}

impl CategoryAllocator {
    fn allocate(&mut self, name: &str) -> PresetIndex {
        // The ceiling is MAX - 1, not MAX: the entity record stores the
        // index plus one in a 20-bit field.
        debug_assert!(
            self.next_index < PresetIndex::MAX,
            "preset index space exhausted"
        );
        let index = PresetIndex(self.next_index);
        self.index_by_name.insert(name.to_string(), index);
        self.next_index += 1;
        self.dense_by_index.resize(self.next_index as usize, SLOT_ABSENT);
        index
    }
}

/// Allocates and remembers preset indexes for both categories.
#[derive(Debug, Default)]
pub struct IndexAllocator {
    primary: CategoryAllocator,
    secondary: CategoryAllocator,
}

impl IndexAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn category(&self, category: Category) -> &CategoryAllocator {
        match category {
            Category::Primary => &self.primary,
            Category::Secondary => &self.secondary,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut CategoryAllocator {
        match category {
            Category::Primary => &mut self.primary,
            Category::Secondary => &mut self.secondary,
        }
    }

    /// Return the index assigned to `name` in `category`, assigning the
    /// category's next free index if the name has none yet.
    ///
    /// A fresh assignment also reserves the name in the opposite category's
    /// map (sparse slot only, no dense record). The two index spaces stay
    /// append-consistent that way, so an entity whose category
    /// classification changes after it has an assignment cannot land on an
    /// index the other category already handed to a different name.
    pub fn get_or_assign(&mut self, category: Category, name: &str) -> PresetIndex {
        if let Some(&index) = self.category(category).index_by_name.get(name) {
            return index;
        }

        let index = self.category_mut(category).allocate(name);

        let opposite = self.category_mut(category.opposite());
        if !opposite.index_by_name.contains_key(name) {
            opposite.allocate(name);
        }

        index
    }

    /// Look up an assignment without creating one.
    pub fn lookup(&self, category: Category, name: &str) -> Option<PresetIndex> {
        self.category(category).index_by_name.get(name).copied()
    }

    /// Resolve an index to its dense-store position, if the preset is
    /// present. Out-of-bounds indexes and reserved-but-absent slots both
    /// yield `None`.
    pub fn dense_slot(&self, category: Category, index: PresetIndex) -> Option<usize> {
        let slot = *self
            .category(category)
            .dense_by_index
            .get(index.0 as usize)?;
        if slot == SLOT_ABSENT {
            return None;
        }
        Some(slot as usize)
    }

    /// Point an index's sparse slot at a dense-store position.
    pub fn bind_dense(&mut self, category: Category, index: PresetIndex, dense_pos: usize) {
        let cat = self.category_mut(category);
        if (index.0 as usize) < cat.dense_by_index.len() {
            cat.dense_by_index[index.0 as usize] = dense_pos as u32;
        }
    }

    /// Mark an index's sparse slot absent.
    pub fn clear_dense(&mut self, category: Category, index: PresetIndex) {
        let cat = self.category_mut(category);
        if (index.0 as usize) < cat.dense_by_index.len() {
            cat.dense_by_index[index.0 as usize] = SLOT_ABSENT;
        }
    }

    /// The category's next free index. Persisted as the record header.
    pub fn next_index(&self, category: Category) -> u32 {
        self.category(category).next_index
    }

    /// Number of names with an assignment in the category (including
    /// cross-category reservations).
    pub fn assigned_count(&self, category: Category) -> usize {
        self.category(category).index_by_name.len()
    }

    /// Iterate the category's name-to-index assignments, in no fixed order.
    pub fn entries(&self, category: Category) -> impl Iterator<Item = (&str, PresetIndex)> {
        self.category(category)
            .index_by_name
            .iter()
            .map(|(name, &index)| (name.as_str(), index))
    }

    /// Restore path: install a saved assignment verbatim. The sparse array
    /// is grown to cover the index; `PresetStore::assign_indexes` rebinds
    /// dense positions afterwards.
    pub fn restore_entry(&mut self, category: Category, name: &str, index: PresetIndex) {
        let cat = self.category_mut(category);
        cat.index_by_name.insert(name.to_string(), index);
        let needed = (index.0 as usize + 1).max(cat.next_index as usize);
        if cat.dense_by_index.len() < needed {
            cat.dense_by_index.resize(needed, SLOT_ABSENT);
        }
    }

    /// Restore path: install the saved next-free-index counter.
    pub fn set_next_index(&mut self, category: Category, next_index: u32) {
        let cat = self.category_mut(category);
        cat.next_index = next_index;
        if cat.dense_by_index.len() < next_index as usize {
            cat.dense_by_index.resize(next_index as usize, SLOT_ABSENT);
        }
    }

    /// Forget one category's assignments (revert path).
    pub fn reset_category(&mut self, category: Category) {
        let cat = self.category_mut(category);
        cat.index_by_name.clear();
        cat.next_index = 0;
        cat.dense_by_index.clear();
    }

    /// Forget all assignments (revert path).
    pub fn reset(&mut self) {
        self.reset_category(Category::Primary);
        self.reset_category(Category::Secondary);
    }
}
