/// Identifies a preset within one category. Cheap to copy and compare.
///
/// Indexes are 20-bit values assigned once per distinct preset name per
/// category and never reused, even if the preset is later removed. That
/// stability is what lets the save format refer to presets by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PresetIndex(pub u32);

impl PresetIndex {
    /// Width of the index field. Permits 1,048,576 presets per category.
    pub const BIT_WIDTH: u32 = 20;

    /// Largest representable index.
    pub const MAX: u32 = (1 << Self::BIT_WIDTH) - 1;
}

/// Identifies a runtime entity in the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u32);

/// One of the two independent preset namespaces.
///
/// Every preset name belongs to exactly one category at load time, but the
/// allocator reserves its index in both (see `IndexAllocator::get_or_assign`)
/// so that an entity whose classification changes later cannot collide with
/// an index already handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Primary,
    Secondary,
}

impl Category {
    /// The other category.
    pub fn opposite(self) -> Category {
        match self {
            Category::Primary => Category::Secondary,
            Category::Secondary => Category::Primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_index_equality() {
        let a = PresetIndex(0);
        let b = PresetIndex(0);
        let c = PresetIndex(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn preset_index_max_is_20_bits() {
        assert_eq!(PresetIndex::MAX, 0x000F_FFFF);
    }

    #[test]
    fn entity_id_is_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(EntityId(0x14), "player");
        assert_eq!(map[&EntityId(0x14)], "player");
    }

    #[test]
    fn category_opposite_round_trips() {
        assert_eq!(Category::Primary.opposite(), Category::Secondary);
        assert_eq!(Category::Secondary.opposite(), Category::Primary);
        assert_eq!(Category::Primary.opposite().opposite(), Category::Primary);
    }
}
