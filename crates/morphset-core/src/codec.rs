//! Binary encoding of the entity registry and the preset-index map.
//!
//! Both record types travel over a host-supplied chunked stream: the
//! codec never assumes it can write an unbounded span in one call, and on
//! read the host may hand back chunks of any size. All traffic goes
//! through a bounded 64 KiB local buffer, so entries routinely span
//! chunk boundaries.
//!
//! Byte order is little-endian throughout, fixed regardless of host
//! architecture.
//!
//! Wire layouts (version 0):
//!
//! *Entity registry* -- a flat run of 8-byte tuples
//! `(entity_id: u32, persisted_state: u32)`, no count, no terminator;
//! length is whatever the stream holds. `persisted_state` is pre-masked
//! by [`EntityState::PERSISTED_MASK`].
//!
//! *Preset-index map* -- for `Primary` then `Secondary`: a `next_index:
//! u32` header, then entries `(name_len: u32, index: u32, name_bytes)`
//! padded with zeros so every entry starts 4-byte-aligned relative to the
//! record start, terminated by `name_len == 0`.

use crate::allocator::IndexAllocator;
use crate::id::{Category, EntityId, PresetIndex};
use crate::registry::{EntityRegistry, EntityState};
use thiserror::Error;

/// Size of the codec's local chunk buffer. A multiple of 8, so entity
/// tuples never straddle a refill, and of 4, so aligned u32 fields do not
/// either. Name bytes may straddle freely.
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Failure reported by the host's stream implementation.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("host stream failure: {0}")]
pub struct StreamError(pub String);

/// Write half of the host stream seam. A single record's bytes are
/// delivered as a sequence of chunks, each at most [`BUFFER_SIZE`] long.
pub trait ChunkSink {
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StreamError>;
}

/// Read half of the host stream seam. `Ok(0)` means the current record
/// holds no further bytes.
pub trait ChunkSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;
}

/// Decode failure. Fatal for the record being decoded, not for the host's
/// wider restore.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    /// The entity record's byte count is not a multiple of the tuple size.
    #[error("entity record ends mid-tuple ({residual} trailing bytes)")]
    MisalignedEntityRecord { residual: usize },
    /// The preset map ended inside a category header or entry header.
    #[error("preset map record truncated in a header")]
    TruncatedHeader,
    /// The preset map ended inside an entry's body.
    #[error("preset map record truncated inside an entry")]
    TruncatedEntry,
    /// A decoded counter or index field does not fit the 20-bit index
    /// space. Rejecting these up front also caps how far the sparse
    /// arrays can be grown by a corrupt record.
    #[error("preset map index field {value:#x} exceeds the 20-bit index space")]
    IndexOutOfRange { value: u32 },
    #[error("preset map entry name is not valid UTF-8")]
    InvalidName(#[from] std::string::FromUtf8Error),
}

// ---------------------------------------------------------------------------
// Buffered writer over a ChunkSink
// ---------------------------------------------------------------------------

struct ChunkWriter<'a, S: ChunkSink + ?Sized> {
    sink: &'a mut S,
    buf: Vec<u8>,
    /// Bytes handed to `put_bytes` since record start, flushed or not.
    /// Drives entry alignment in the preset map record.
    total: usize,
}

impl<'a, S: ChunkSink + ?Sized> ChunkWriter<'a, S> {
    fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            buf: Vec::with_capacity(BUFFER_SIZE),
            total: 0,
        }
    }

    fn put_bytes(&mut self, mut bytes: &[u8]) -> Result<(), StreamError> {
        self.total += bytes.len();
        while !bytes.is_empty() {
            let room = BUFFER_SIZE - self.buf.len();
            let take = room.min(bytes.len());
            self.buf.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.buf.len() == BUFFER_SIZE {
                self.sink.write_chunk(&self.buf)?;
                self.buf.clear();
            }
        }
        Ok(())
    }

    fn put_u32(&mut self, value: u32) -> Result<(), StreamError> {
        self.put_bytes(&value.to_le_bytes())
    }

    /// Zero-pad so the next field starts 4-byte-aligned relative to the
    /// record start.
    fn pad_to_align4(&mut self) -> Result<(), StreamError> {
        const ZEROS: [u8; 3] = [0; 3];
        let rem = self.total % 4;
        if rem != 0 {
            self.put_bytes(&ZEROS[..4 - rem])?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<(), StreamError> {
        if !self.buf.is_empty() {
            self.sink.write_chunk(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Buffered reader over a ChunkSource
// ---------------------------------------------------------------------------

struct ChunkReader<'a, S: ChunkSource + ?Sized> {
    source: &'a mut S,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl<'a, S: ChunkSource + ?Sized> ChunkReader<'a, S> {
    fn new(source: &'a mut S) -> Self {
        Self {
            source,
            buf: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Refill the whole buffer from as many host reads as it takes. Only
    /// the final refill of a record can come up short, so fixed-width
    /// fields at aligned offsets never straddle a refill.
    fn refill(&mut self) -> Result<(), StreamError> {
        self.buf.resize(BUFFER_SIZE, 0);
        let mut filled = 0;
        while filled < BUFFER_SIZE {
            let n = self.source.read_chunk(&mut self.buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.buf.truncate(filled);
        self.pos = 0;
        self.eof = filled < BUFFER_SIZE;
        Ok(())
    }

    /// Ensure at least one unread byte is buffered. Returns `false` at
    /// end of record.
    fn ensure(&mut self) -> Result<bool, StreamError> {
        if self.remaining() > 0 {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        self.refill()?;
        Ok(self.remaining() > 0)
    }

    /// Read a little-endian u32 starting at a 4-aligned record offset.
    /// `Ok(None)` on clean end of record; an error if the record ends
    /// partway through the field.
    fn take_u32(&mut self) -> Result<Option<u32>, CodecError> {
        if !self.ensure()? {
            return Ok(None);
        }
        if self.remaining() < 4 {
            return Err(CodecError::TruncatedHeader);
        }
        let mut field = [0u8; 4];
        field.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(Some(u32::from_le_bytes(field)))
    }

    /// Read exactly `len` bytes, spanning refills as needed. Errors if the
    /// record ends first.
    fn take_bytes(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        while out.len() < len {
            if !self.ensure()? {
                return Err(CodecError::TruncatedEntry);
            }
            let take = self.remaining().min(len - out.len());
            out.extend_from_slice(&self.buf[self.pos..self.pos + take]);
            self.pos += take;
        }
        Ok(out)
    }

    /// Skip `len` bytes (alignment padding), spanning refills as needed.
    fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        let mut left = len;
        while left > 0 {
            if !self.ensure()? {
                return Err(CodecError::TruncatedEntry);
            }
            let take = self.remaining().min(left);
            self.pos += take;
            left -= take;
        }
        Ok(())
    }

    /// Count of bytes left in the record, draining it. Used for
    /// trailing-byte diagnostics.
    fn drain(&mut self) -> Result<usize, StreamError> {
        let mut total = 0;
        loop {
            total += self.remaining();
            self.pos = self.buf.len();
            if self.eof {
                return Ok(total);
            }
            self.refill()?;
            if self.remaining() == 0 {
                return Ok(total);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entity registry record
// ---------------------------------------------------------------------------

/// Write every registry entry as an 8-byte tuple. Transient bits are
/// stripped by the mask before they touch the wire.
pub fn encode_entity_registry<S: ChunkSink + ?Sized>(
    sink: &mut S,
    registry: &EntityRegistry,
) -> Result<(), CodecError> {
    let mut writer = ChunkWriter::new(sink);
    let mut failure: Option<StreamError> = None;
    registry.for_each_while(|id, state| {
        let mut tuple = [0u8; 8];
        tuple[..4].copy_from_slice(&id.0.to_le_bytes());
        tuple[4..].copy_from_slice(&state.persisted_bits().to_le_bytes());
        match writer.put_bytes(&tuple) {
            Ok(()) => true,
            Err(err) => {
                failure = Some(err);
                false
            }
        }
    });
    if let Some(err) = failure {
        return Err(err.into());
    }
    writer.finish()?;
    Ok(())
}

/// Read 8-byte tuples until end of record, installing each into the
/// registry. A record length that is not a multiple of 8 is a fatal
/// integrity error; the caller decides what to do with the partially
/// populated registry.
pub fn decode_entity_registry<S: ChunkSource + ?Sized>(
    source: &mut S,
    registry: &EntityRegistry,
) -> Result<(), CodecError> {
    let mut reader = ChunkReader::new(source);
    loop {
        if !reader.ensure()? {
            return Ok(());
        }
        let residual = reader.remaining();
        if residual < 8 {
            return Err(CodecError::MisalignedEntityRecord { residual });
        }
        let mut tuple = [0u8; 8];
        tuple.copy_from_slice(&reader.buf[reader.pos..reader.pos + 8]);
        reader.pos += 8;

        let id = EntityId(u32::from_le_bytes([tuple[0], tuple[1], tuple[2], tuple[3]]));
        let bits = u32::from_le_bytes([tuple[4], tuple[5], tuple[6], tuple[7]]);
        registry.insert(id, EntityState::from_persisted(bits));
    }
}

// ---------------------------------------------------------------------------
// Preset-index map record
// ---------------------------------------------------------------------------

/// Write both categories' name-to-index assignments with their next-free
/// counters. Entry order within a category is unspecified.
pub fn encode_preset_map<S: ChunkSink + ?Sized>(
    sink: &mut S,
    allocator: &IndexAllocator,
) -> Result<(), CodecError> {
    let mut writer = ChunkWriter::new(sink);
    for category in [Category::Primary, Category::Secondary] {
        writer.put_u32(allocator.next_index(category))?;
        for (name, index) in allocator.entries(category) {
            writer.put_u32(name.len() as u32)?;
            writer.put_u32(index.0)?;
            writer.put_bytes(name.as_bytes())?;
            writer.pad_to_align4()?;
        }
        // Terminator for this category.
        writer.put_u32(0)?;
    }
    writer.finish()?;
    Ok(())
}

/// Read both categories' assignments into the allocator. On error the
/// allocator may be partially populated; the caller resets it.
pub fn decode_preset_map<S: ChunkSource + ?Sized>(
    source: &mut S,
    allocator: &mut IndexAllocator,
) -> Result<(), CodecError> {
    let mut reader = ChunkReader::new(source);
    for category in [Category::Primary, Category::Secondary] {
        let next_index = reader.take_u32()?.ok_or(CodecError::TruncatedHeader)?;
        if next_index > PresetIndex::MAX {
            return Err(CodecError::IndexOutOfRange { value: next_index });
        }
        allocator.set_next_index(category, next_index);
        loop {
            let name_len = reader.take_u32()?.ok_or(CodecError::TruncatedHeader)?;
            if name_len == 0 {
                break;
            }
            let index = match reader.take_u32()? {
                Some(index) => index,
                None => return Err(CodecError::TruncatedEntry),
            };
            if index > PresetIndex::MAX {
                return Err(CodecError::IndexOutOfRange { value: index });
            }
            let name_bytes = reader.take_bytes(name_len as usize)?;
            reader.skip(padding_after(name_len as usize))?;
            let name = String::from_utf8(name_bytes)?;
            allocator.restore_entry(category, &name, PresetIndex(index));
        }
    }
    let trailing = reader.drain()?;
    if trailing > 0 {
        log::warn!("preset map record carries {trailing} trailing bytes, ignored");
    }
    Ok(())
}

/// Zero bytes required after `name_len` name bytes to keep the next entry
/// 4-byte-aligned. Headers are u32 pairs, so only names disturb alignment.
fn padding_after(name_len: usize) -> usize {
    (4 - name_len % 4) % 4
}
