//! Morphset Core -- stable preset bookkeeping for entity appearance systems.
//!
//! This crate tracks which appearance preset each simulated entity wears,
//! hands out save-stable indexes for preset names, and serializes both
//! structures over a host-supplied chunked stream.
//!
//! # Stable Indexes
//!
//! Preset names get a compact per-category index the first time they are
//! seen, and that assignment is permanent for the lifetime of a save:
//! removing a preset retires its dense record but never frees its index,
//! so an entity bound to index 3 still means the same preset after any
//! number of load-order changes. See [`allocator::IndexAllocator`].
//!
//! # Key Types
//!
//! - [`store::PresetStore`] -- Loaded presets of both categories plus
//!   index assignment, name lookup, and random selection.
//! - [`registry::EntityRegistry`] -- Concurrent per-entity state; one
//!   bit-packed 32-bit record per tracked entity.
//! - [`event::ChangeDispatcher`] -- Fan-out of preset-change
//!   notifications with per-entity recursion protection.
//! - [`codec`] -- Little-endian wire format for both persisted records,
//!   buffered over the host's chunked stream seam.
//! - [`save`] -- Record-oriented save/load/revert orchestration.
//! - [`rng::SimRng`] -- Deterministic RNG behind random preset picks.

pub mod allocator;
pub mod codec;
pub mod event;
pub mod id;
pub mod preset;
pub mod registry;
pub mod rng;
pub mod save;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
