//! Property-based tests for the wire codec and allocator.
//!
//! Uses proptest to generate random allocator/registry populations and
//! adversarial host chunk sizes, then verifies round-trip fidelity and
//! allocation invariants.

use morphset_core::allocator::IndexAllocator;
use morphset_core::codec::{
    decode_entity_registry, decode_preset_map, encode_entity_registry, encode_preset_map,
};
use morphset_core::id::{Category, EntityId, PresetIndex};
use morphset_core::registry::EntityRegistry;
use morphset_core::test_utils::MemoryStream;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// Random preset names, including empty-adjacent and padding-hostile
/// lengths (1..24 bytes of printable ASCII).
fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _-]{1,24}"
}

fn arb_allocator() -> impl Strategy<Value = IndexAllocator> {
    proptest::collection::vec((arb_name(), prop::bool::ANY), 0..40).prop_map(|names| {
        let mut alloc = IndexAllocator::new();
        for (name, primary) in names {
            let category = if primary {
                Category::Primary
            } else {
                Category::Secondary
            };
            alloc.get_or_assign(category, &name);
        }
        alloc
    })
}

fn arb_registry() -> impl Strategy<Value = EntityRegistry> {
    proptest::collection::vec((any::<u32>(), 0..PresetIndex::MAX), 0..200).prop_map(|entries| {
        let registry = EntityRegistry::new();
        for (id, index) in entries {
            registry.set_preset(EntityId(id), Some(PresetIndex(index)));
        }
        registry
    })
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every registry entry survives encode/decode unchanged.
    #[test]
    fn entity_registry_round_trip(registry in arb_registry()) {
        let mut stream = MemoryStream::new();
        encode_entity_registry(&mut stream, &registry).unwrap();

        let restored = EntityRegistry::new();
        decode_entity_registry(&mut stream.reader(), &restored).unwrap();

        prop_assert_eq!(restored.len(), registry.len());
        let all_match = registry.for_each_while(|id, state| {
            restored.get(id) == Some(state)
        });
        prop_assert!(all_match);
    }

    /// Every assignment and both counters survive encode/decode, no
    /// matter how the host chunks the read side.
    #[test]
    fn preset_map_round_trip(alloc in arb_allocator(), chunk in 1usize..48) {
        let mut stream = MemoryStream::new();
        encode_preset_map(&mut stream, &alloc).unwrap();

        let mut restored = IndexAllocator::new();
        let mut reader = stream.reader().with_chunk_limit(chunk);
        decode_preset_map(&mut reader, &mut restored).unwrap();

        for category in [Category::Primary, Category::Secondary] {
            prop_assert_eq!(restored.next_index(category), alloc.next_index(category));
            prop_assert_eq!(
                restored.assigned_count(category),
                alloc.assigned_count(category)
            );
            for (name, index) in alloc.entries(category) {
                prop_assert_eq!(restored.lookup(category, name), Some(index));
            }
        }
    }

    /// Truncating an encoded preset map anywhere strictly inside the
    /// payload either errors or (if the cut lands on trailing bytes the
    /// decoder ignores) yields a subset of the original assignments --
    /// it never panics and never invents entries.
    #[test]
    fn truncated_preset_map_never_panics(alloc in arb_allocator(), cut in 0usize..2048) {
        let mut stream = MemoryStream::new();
        encode_preset_map(&mut stream, &alloc).unwrap();
        let bytes = stream.bytes().to_vec();
        let cut = cut.min(bytes.len());

        let mut truncated = MemoryStream::from_bytes(bytes[..cut].to_vec());
        let mut restored = IndexAllocator::new();
        if decode_preset_map(&mut truncated.reader(), &mut restored).is_ok() {
            for category in [Category::Primary, Category::Secondary] {
                for (name, index) in restored.entries(category) {
                    prop_assert_eq!(alloc.lookup(category, name), Some(index));
                }
            }
        }
    }

    /// Allocation is stable: re-requesting every name after arbitrary
    /// interleaving returns the original index.
    #[test]
    fn allocation_is_stable(
        names in proptest::collection::vec(arb_name(), 1..30),
    ) {
        let mut alloc = IndexAllocator::new();
        let mut first: Vec<(String, PresetIndex)> = Vec::new();
        for name in &names {
            let index = alloc.get_or_assign(Category::Primary, name);
            if !first.iter().any(|(n, _)| n == name) {
                first.push((name.clone(), index));
            }
        }
        for (name, index) in &first {
            prop_assert_eq!(alloc.get_or_assign(Category::Primary, name), *index);
        }
        // Distinct names got distinct indexes.
        let mut indexes: Vec<u32> = first.iter().map(|(_, i)| i.0).collect();
        indexes.sort_unstable();
        indexes.dedup();
        prop_assert_eq!(indexes.len(), first.len());
    }

    /// The two categories always agree on how many indexes exist once a
    /// name is assigned anywhere (cross-category mirroring).
    #[test]
    fn mirroring_keeps_counters_in_step(alloc in arb_allocator()) {
        prop_assert_eq!(
            alloc.next_index(Category::Primary),
            alloc.next_index(Category::Secondary)
        );
        for (name, _) in alloc.entries(Category::Primary) {
            prop_assert!(alloc.lookup(Category::Secondary, name).is_some());
        }
    }
}
