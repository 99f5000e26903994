//! Shared helpers for tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! stay out of release builds but remain reachable from integration tests
//! (which enable the `test-utils` feature).

use crate::codec::{ChunkSink, ChunkSource, StreamError};
use crate::preset::{Preset, Slider, SliderSet};
use crate::save::{LoadStream, RecordInfo, SaveStream};

#[derive(Debug, Clone)]
struct Record {
    kind: [u8; 4],
    version: u32,
    bytes: Vec<u8>,
}

/// In-memory stand-in for the host's record-oriented save container.
///
/// Chunks written before any `open_record` call land in an anonymous
/// record, which is what the codec-level tests read back. Record-level
/// tests drive it through the [`SaveStream`] / [`LoadStream`] seams.
#[derive(Debug, Default)]
pub struct MemoryStream {
    records: Vec<Record>,
    chunks: usize,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream holding one anonymous record with the given payload.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            records: vec![Record {
                kind: [0; 4],
                version: 0,
                bytes,
            }],
            chunks: 1,
        }
    }

    /// Append a fully formed record (for crafting malformed streams).
    pub fn push_record(&mut self, kind: [u8; 4], version: u32, bytes: Vec<u8>) {
        self.records.push(Record {
            kind,
            version,
            bytes,
        });
    }

    /// Swap the payload of the first record with the given kind.
    /// Panics if no such record exists.
    pub fn replace_record(&mut self, kind: [u8; 4], bytes: Vec<u8>) {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.kind == kind)
            .expect("no record with that kind");
        record.bytes = bytes;
    }

    /// Append raw bytes to the latest record without a chunk boundary.
    pub fn append(&mut self, bytes: &[u8]) {
        self.current_record().bytes.extend_from_slice(bytes);
    }

    /// Payload of the latest record (empty if nothing was written).
    pub fn bytes(&self) -> &[u8] {
        self.records
            .last()
            .map(|r| r.bytes.as_slice())
            .unwrap_or(&[])
    }

    /// Number of chunks handed to `write_chunk` so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// A reader over a snapshot of the stream's current contents.
    pub fn reader(&self) -> MemoryReader {
        MemoryReader {
            records: self.records.clone(),
            index: 0,
            pos: 0,
            started: false,
            chunk_limit: None,
        }
    }

    fn current_record(&mut self) -> &mut Record {
        if self.records.is_empty() {
            self.records.push(Record {
                kind: [0; 4],
                version: 0,
                bytes: Vec::new(),
            });
        }
        self.records.last_mut().unwrap()
    }
}

impl ChunkSink for MemoryStream {
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StreamError> {
        self.chunks += 1;
        self.current_record().bytes.extend_from_slice(chunk);
        Ok(())
    }
}

impl SaveStream for MemoryStream {
    fn open_record(&mut self, kind: [u8; 4], version: u32) -> Result<(), StreamError> {
        self.records.push(Record {
            kind,
            version,
            bytes: Vec::new(),
        });
        Ok(())
    }
}

/// Read side of [`MemoryStream`]. Optionally rations bytes out in tiny
/// chunks to force decoders to reassemble fields across host reads.
#[derive(Debug)]
pub struct MemoryReader {
    records: Vec<Record>,
    index: usize,
    pos: usize,
    started: bool,
    chunk_limit: Option<usize>,
}

impl MemoryReader {
    /// Cap every `read_chunk` at `limit` bytes.
    pub fn with_chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = Some(limit);
        self
    }
}

impl ChunkSource for MemoryReader {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let Some(record) = self.records.get(self.index) else {
            return Ok(0);
        };
        let remaining = record.bytes.len() - self.pos;
        let mut take = remaining.min(buf.len());
        if let Some(limit) = self.chunk_limit {
            take = take.min(limit);
        }
        buf[..take].copy_from_slice(&record.bytes[self.pos..self.pos + take]);
        self.pos += take;
        Ok(take)
    }
}

impl LoadStream for MemoryReader {
    fn next_record(&mut self) -> Option<RecordInfo> {
        if self.started {
            self.index += 1;
        } else {
            self.started = true;
        }
        self.pos = 0;
        self.records.get(self.index).map(|r| RecordInfo {
            kind: r.kind,
            version: r.version,
            length: r.bytes.len() as u32,
        })
    }
}

/// A preset with no sliders, for tests that only care about names.
pub fn bare_preset(name: &str) -> Preset {
    Preset::new(name, "test", SliderSet::new())
}

/// A preset with a couple of representative sliders.
pub fn sample_preset(name: &str, style: &str) -> Preset {
    let mut sliders = SliderSet::new();
    sliders.insert("Waist", Slider::range(0.1, 0.6));
    sliders.insert("Hips", Slider::fixed(0.4));
    Preset::new(name, style, sliders)
}
