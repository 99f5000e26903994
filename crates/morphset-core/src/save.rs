//! Save-state orchestration over a record-oriented host stream.
//!
//! The host exposes a tagged-record container (open a record, write
//! chunks; enumerate records, read chunks). This module maps the two
//! codec record types onto that container and keeps every failure local:
//! a bad or unknown record is logged and skipped, never allowed to abort
//! the host's wider save or restore.

use crate::allocator::IndexAllocator;
use crate::codec::{
    self, ChunkSink, ChunkSource, StreamError,
};
use crate::registry::EntityRegistry;

/// Record tag for the entity registry record.
pub const RECORD_ENTITY_REGISTRY: [u8; 4] = *b"MSRG";
/// Record tag for the preset-index map record.
pub const RECORD_PRESET_INDEX_MAP: [u8; 4] = *b"MSPI";

/// Current version written for the entity registry record.
pub const ENTITY_REGISTRY_VERSION: u32 = 0;
/// Current version written for the preset-index map record.
pub const PRESET_INDEX_MAP_VERSION: u32 = 0;

/// Header of a record encountered while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInfo {
    pub kind: [u8; 4],
    pub version: u32,
    pub length: u32,
}

/// Host seam for writing: a chunk sink that can additionally start a new
/// tagged record. Chunks written after `open_record` belong to that
/// record.
pub trait SaveStream: ChunkSink {
    fn open_record(&mut self, kind: [u8; 4], version: u32) -> Result<(), StreamError>;
}

/// Host seam for reading: a chunk source that enumerates tagged records.
/// `next_record` abandons any unread tail of the previous record.
pub trait LoadStream: ChunkSource {
    fn next_record(&mut self) -> Option<RecordInfo>;
}

/// Write both records. Each record is attempted independently; a failure
/// is logged and the other record still written. Returns whether both
/// records made it out intact.
pub fn save_state<S: SaveStream + ?Sized>(
    stream: &mut S,
    registry: &EntityRegistry,
    allocator: &IndexAllocator,
) -> bool {
    let mut ok = true;

    match stream.open_record(RECORD_ENTITY_REGISTRY, ENTITY_REGISTRY_VERSION) {
        Ok(()) => {
            if let Err(err) = codec::encode_entity_registry(stream, registry) {
                log::error!("failed to write entity registry record: {err}");
                ok = false;
            }
        }
        Err(err) => {
            log::error!("failed to open entity registry record: {err}");
            ok = false;
        }
    }

    match stream.open_record(RECORD_PRESET_INDEX_MAP, PRESET_INDEX_MAP_VERSION) {
        Ok(()) => {
            if let Err(err) = codec::encode_preset_map(stream, allocator) {
                log::error!("failed to write preset map record: {err}");
                ok = false;
            }
        }
        Err(err) => {
            log::error!("failed to open preset map record: {err}");
            ok = false;
        }
    }

    ok
}

/// Read every record the stream offers, dispatching on `(kind, version)`.
///
/// Unknown kinds and unknown versions are logged and skipped. Only the
/// first record of each known kind is honored; duplicates are warned
/// about and ignored. A record that fails to decode leaves its target
/// structure reset to default rather than partially populated.
pub fn load_state<S: LoadStream + ?Sized>(
    stream: &mut S,
    registry: &EntityRegistry,
    allocator: &mut IndexAllocator,
) {
    let mut seen_registry = false;
    let mut seen_map = false;

    while let Some(info) = stream.next_record() {
        match (info.kind, info.version) {
            (RECORD_ENTITY_REGISTRY, ENTITY_REGISTRY_VERSION) => {
                if seen_registry {
                    log::warn!("duplicate entity registry record, ignoring");
                    continue;
                }
                seen_registry = true;
                registry.clear();
                if let Err(err) = codec::decode_entity_registry(stream, registry) {
                    log::error!("entity registry record rejected: {err}");
                    registry.clear();
                }
            }
            (RECORD_PRESET_INDEX_MAP, PRESET_INDEX_MAP_VERSION) => {
                if seen_map {
                    log::warn!("duplicate preset map record, ignoring");
                    continue;
                }
                seen_map = true;
                allocator.reset();
                if let Err(err) = codec::decode_preset_map(stream, allocator) {
                    log::error!("preset map record rejected: {err}");
                    allocator.reset();
                }
            }
            (kind, version) => {
                log::warn!(
                    "skipping unrecognized record {} v{version}",
                    kind.escape_ascii()
                );
            }
        }
    }
}

/// Undo a prior load: drop all tracked entities and forget every index
/// assignment, counters and sparse arrays included.
pub fn revert_state(registry: &EntityRegistry, allocator: &mut IndexAllocator) {
    registry.clear();
    allocator.reset();
}
