//! Parsed assembly store.
//!
//! A [`Store`] owns the full container buffer.  Construction decodes the
//! header and all three tables in one pass; any [`FormatError`] aborts the
//! parse so a partially decoded store is never observable.  Payload access
//! hands out borrowed views into the owned buffer.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::codec::{decode_payload, CodecError, Encoding};
use crate::header::{FormatError, StoreHeader, HEADER_SIZE};
use crate::record::{EntryKey, Hash32Record, Hash64Record, HashRecord, HashValue, PayloadRecord, Span};
use crate::table::TableCursor;

/// Per-payload failure.  Local to one payload; the run goes on.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("empty payload")]
    EmptyPayload,
    #[error("out of bounds: offset {offset} + size {size} exceeds store length {len}")]
    OutOfBounds { offset: u32, size: u32, len: usize },
    #[error(transparent)]
    Decompression(#[from] CodecError),
}

/// Decoded payload bytes plus how they were stored.
#[derive(Debug)]
pub struct Payload<'a> {
    pub encoding: Encoding,
    pub bytes:    Cow<'a, [u8]>,
}

#[derive(Debug)]
pub struct Store {
    raw:           Vec<u8>,
    pub header:    StoreHeader,
    pub directory: Vec<PayloadRecord>,
    pub hash32:    Vec<Hash32Record>,
    pub hash64:    Vec<Hash64Record>,
    hash32_by_key: HashMap<EntryKey, usize>,
    hash64_by_key: HashMap<EntryKey, usize>,
}

impl Store {
    /// Read `path` fully into memory and parse it.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let raw = fs::read(path)?;
        Ok(Self::from_bytes(raw)?)
    }

    pub fn from_bytes(raw: Vec<u8>) -> Result<Self, FormatError> {
        let header = StoreHeader::decode(&raw)?;
        let count  = header.local_count;

        let mut cursor = TableCursor::new(&raw, HEADER_SIZE);
        let directory  = cursor.read_table::<PayloadRecord>(count)?;
        let hash32     = cursor.read_table::<Hash32Record>(count)?;
        let hash64     = cursor.read_table::<Hash64Record>(count)?;

        let hash32_by_key = index_by_key(&hash32);
        let hash64_by_key = index_by_key(&hash64);

        Ok(Self { raw, header, directory, hash32, hash64, hash32_by_key, hash64_by_key })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn store_id(&self) -> u32 {
        self.header.store_id
    }

    /// Join key for directory slot `index`.
    pub fn key(&self, index: u32) -> EntryKey {
        EntryKey::new(self.header.store_id, index)
    }

    /// Bounds-checked view of one section.
    pub fn locate(&self, span: Span) -> Result<&[u8], ExtractionError> {
        locate(&self.raw, span)
    }

    /// Locate and decode one section, inflating compressed blocks.
    pub fn read_section(&self, span: Span) -> Result<Payload<'_>, ExtractionError> {
        let data = self.locate(span)?;
        let encoding = Encoding::detect(data);
        let bytes = decode_payload(data)?;
        Ok(Payload { encoding, bytes })
    }

    /// Hash-table entries describing directory slot `key`, if present.
    /// Tables are joined by key, not position; the first record for a key wins.
    pub fn hash_entries(&self, key: EntryKey) -> (Option<&Hash32Record>, Option<&Hash64Record>) {
        (
            self.hash32_by_key.get(&key).map(|&i| &self.hash32[i]),
            self.hash64_by_key.get(&key).map(|&i| &self.hash64[i]),
        )
    }
}

/// Borrow `span` out of `buf`.  Empty spans and spans running past the end
/// of the buffer (including `offset + size` overflow) are rejected.
pub fn locate(buf: &[u8], span: Span) -> Result<&[u8], ExtractionError> {
    if span.is_empty() {
        return Err(ExtractionError::EmptyPayload);
    }
    let start = span.offset as usize;
    match start.checked_add(span.size as usize) {
        Some(end) if end <= buf.len() => Ok(&buf[start..end]),
        _ => Err(ExtractionError::OutOfBounds {
            offset: span.offset,
            size:   span.size,
            len:    buf.len(),
        }),
    }
}

fn index_by_key<H: HashValue>(table: &[HashRecord<H>]) -> HashMap<EntryKey, usize> {
    let mut map = HashMap::with_capacity(table.len());
    for (i, rec) in table.iter().enumerate() {
        map.entry(rec.key()).or_insert(i);
    }
    map
}

impl TryFrom<Vec<u8>> for Store {
    type Error = FormatError;

    fn try_from(raw: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_bytes(raw)
    }
}
