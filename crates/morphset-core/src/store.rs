//! Dense preset storage and selection.
//!
//! The store holds the loaded presets of both categories, assigns stable
//! indexes through the [`IndexAllocator`], and answers the lookups the
//! host needs: by index, by name, and random selection subject to the
//! exclusion list.

use crate::allocator::IndexAllocator;
use crate::id::{Category, PresetIndex};
use crate::preset::Preset;
use crate::rng::SimRng;

#[derive(Debug, Default)]
struct CategoryStore {
    /// All loaded presets of the category, in load order until removals
    /// start swap-shuffling the tail.
    all: Vec<Preset>,
    /// Dense positions of presets eligible for random selection.
    normal: Vec<usize>,
    /// Dense positions of presets excluded from random selection.
    excluded: Vec<usize>,
}

/// Owns the loaded presets and their index assignments.
#[derive(Debug, Default)]
pub struct PresetStore {
    primary: CategoryStore,
    secondary: CategoryStore,
    allocator: IndexAllocator,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn category(&self, category: Category) -> &CategoryStore {
        match category {
            Category::Primary => &self.primary,
            Category::Secondary => &self.secondary,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut CategoryStore {
        match category {
            Category::Primary => &mut self.primary,
            Category::Secondary => &mut self.secondary,
        }
    }

    /// Add a loaded preset to a category. `excluded` presets stay loadable
    /// and addressable but are never chosen by [`PresetStore::random`];
    /// the loader decides exclusion (distribution blacklists, utility
    /// presets). Duplicate names (case-insensitive) are rejected so every
    /// name maps to at most one dense record. Index assignment happens
    /// later, in [`PresetStore::assign_indexes`].
    pub fn add(&mut self, category: Category, preset: Preset, excluded: bool) -> bool {
        if self.find_by_name(category, &preset.name).is_some() {
            log::debug!(
                "ignoring duplicate preset {:?} in {:?}",
                preset.name,
                category
            );
            return false;
        }
        let cat = self.category_mut(category);
        let pos = cat.all.len();
        cat.all.push(preset);
        if excluded {
            cat.excluded.push(pos);
        } else {
            cat.normal.push(pos);
        }
        true
    }

    /// Assign stable indexes to every loaded preset that lacks one and bind
    /// the sparse arrays to the dense positions. Idempotent: safe to re-run
    /// after a load or revert restored the allocator underneath the store.
    pub fn assign_indexes(&mut self) {
        for category in [Category::Primary, Category::Secondary] {
            let len = self.category(category).all.len();
            for pos in 0..len {
                let name = self.category(category).all[pos].name.clone();
                let index = self.allocator.get_or_assign(category, &name);
                self.category_mut(category).all[pos].index = Some(index);
                self.allocator.bind_dense(category, index, pos);
            }
        }
    }

    /// Resolve an index to its preset, if one is loaded for it.
    pub fn get(&self, category: Category, index: PresetIndex) -> Option<&Preset> {
        let pos = self.allocator.dense_slot(category, index)?;
        self.category(category).all.get(pos)
    }

    /// Case-insensitive (ASCII) name lookup over the loaded presets.
    pub fn find_by_name(&self, category: Category, name: &str) -> Option<&Preset> {
        self.category(category)
            .all
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Pick a random preset eligible for random selection, or `None` when
    /// the category has no eligible presets.
    pub fn random(&self, category: Category, rng: &mut SimRng) -> Option<&Preset> {
        let cat = self.category(category);
        if cat.normal.is_empty() {
            return None;
        }
        let pos = cat.normal[rng.index(cat.normal.len())];
        cat.all.get(pos)
    }

    /// Pick a random preset whose name appears in `names` (case-insensitive).
    /// Draws from a shrinking candidate pool so a pool polluted with unknown
    /// names still terminates. A pool that is empty, or that exhausts
    /// without a single match, falls back to an unrestricted
    /// [`PresetStore::random`] draw.
    pub fn random_from_names(
        &self,
        category: Category,
        names: &[&str],
        rng: &mut SimRng,
    ) -> Option<&Preset> {
        let mut candidates: Vec<&str> = names.to_vec();
        while !candidates.is_empty() {
            let pick = rng.index(candidates.len());
            let name = candidates.swap_remove(pick);
            if let Some(preset) = self.find_by_name(category, name) {
                return Some(preset);
            }
        }
        self.random(category, rng)
    }

    /// Remove a loaded preset by name. The index assignment survives in the
    /// allocator; only the dense record and its sparse binding go away.
    pub fn remove(&mut self, category: Category, name: &str) -> bool {
        let Some(pos) = self
            .category(category)
            .all
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
        else {
            return false;
        };

        let removed = self.category_mut(category).all.swap_remove(pos);
        if let Some(index) = removed.index {
            self.allocator.clear_dense(category, index);
        }

        let moved_from = self.category(category).all.len();
        drop_position(&mut self.category_mut(category).normal, pos, moved_from);
        drop_position(&mut self.category_mut(category).excluded, pos, moved_from);

        // The record that filled the hole changed dense position.
        if pos < moved_from {
            if let Some(index) = self.category(category).all[pos].index {
                self.allocator.bind_dense(category, index, pos);
            }
        }
        true
    }

    /// Number of loaded presets in the category.
    pub fn len(&self, category: Category) -> usize {
        self.category(category).all.len()
    }

    pub fn is_empty(&self, category: Category) -> bool {
        self.category(category).all.is_empty()
    }

    /// Iterate the loaded presets of a category in dense order.
    pub fn iter(&self, category: Category) -> impl Iterator<Item = &Preset> {
        self.category(category).all.iter()
    }

    pub fn allocator(&self) -> &IndexAllocator {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut IndexAllocator {
        &mut self.allocator
    }

    /// Forget all index assignments, then rebuild them from the loaded
    /// presets (revert path). Loaded presets stay; history goes.
    pub fn reset_indexes(&mut self) {
        self.allocator.reset();
        for category in [Category::Primary, Category::Secondary] {
            for preset in &mut self.category_mut(category).all {
                preset.index = None;
            }
        }
    }
}

/// Maintain a dense-position list across a `swap_remove(pos)` on the
/// backing vec: drop `pos`, and redirect `moved_from` (the old tail) to
/// `pos`.
fn drop_position(list: &mut Vec<usize>, pos: usize, moved_from: usize) {
    list.retain(|&p| p != pos);
    for p in list.iter_mut() {
        if *p == moved_from {
            *p = pos;
        }
    }
}
