//! Record shapes for the payload directory and the two hash indexes.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

use crate::table::Record;

// ── EntryKey ─────────────────────────────────────────────────────────────────

/// Join key between the directory, both hash tables and the external name
/// index: the owning store plus the payload's position in its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryKey {
    pub store_id: u32,
    pub index:    u32,
}

impl EntryKey {
    pub fn new(store_id: u32, index: u32) -> Self {
        Self { store_id, index }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.store_id, self.index)
    }
}

// ── PayloadRecord ────────────────────────────────────────────────────────────

/// Byte range of one section inside the store buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: u32,
    pub size:   u32,
}

impl Span {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Directory entry: six u32 LE fields, 24 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadRecord {
    pub data:   Span,
    pub debug:  Span,
    pub config: Span,
}

impl Record for PayloadRecord {
    const TABLE: &'static str = "directory";
    const STRIDE: usize = 24;

    fn decode(raw: &[u8]) -> Self {
        let span = |at: usize| Span {
            offset: LittleEndian::read_u32(&raw[at..at + 4]),
            size:   LittleEndian::read_u32(&raw[at + 4..at + 8]),
        };
        Self {
            data:   span(0),
            debug:  span(8),
            config: span(16),
        }
    }

    fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for span in [self.data, self.debug, self.config] {
            writer.write_u32::<LittleEndian>(span.offset)?;
            writer.write_u32::<LittleEndian>(span.size)?;
        }
        Ok(())
    }
}

// ── Hash records ─────────────────────────────────────────────────────────────

/// Fixed-width hash value stored at the start of a hash record.
pub trait HashValue: Copy + Eq + fmt::LowerHex + fmt::Debug {
    /// Bytes occupied by the value on disk.
    const WIDTH: usize;
    /// Opaque bytes between the value and the trailing fields, carried
    /// through unchanged.
    type Reserved: Copy + Eq + Default + fmt::Debug + AsRef<[u8]> + AsMut<[u8]>;

    fn read(raw: &[u8]) -> Self;
    fn write<W: Write>(self, writer: W) -> io::Result<()>;

    /// `0x`-prefixed, zero-padded to `2 * WIDTH` lowercase digits.
    fn to_hex(self) -> String {
        format!("0x{:0width$x}", self, width = Self::WIDTH * 2)
    }
}

impl HashValue for u32 {
    const WIDTH: usize = 4;
    type Reserved = [u8; 4];

    fn read(raw: &[u8]) -> Self {
        LittleEndian::read_u32(raw)
    }

    fn write<W: Write>(self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self)
    }
}

impl HashValue for u64 {
    const WIDTH: usize = 8;
    type Reserved = [u8; 0];

    fn read(raw: &[u8]) -> Self {
        LittleEndian::read_u64(raw)
    }

    fn write<W: Write>(self, mut writer: W) -> io::Result<()> {
        writer.write_u64::<LittleEndian>(self)
    }
}

/// Offset of the three trailing u32 fields.  Shared by both hash widths;
/// in the 32-bit variant bytes [4,8) are reserved and kept verbatim.
const HASH_FIELDS_AT: usize = 8;

/// Hash index entry, 20 bytes regardless of hash width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashRecord<H: HashValue> {
    pub hash:              H,
    pub reserved:          H::Reserved,
    pub mapping_index:     u32,
    pub local_store_index: u32,
    pub store_id:          u32,
}

pub type Hash32Record = HashRecord<u32>;
pub type Hash64Record = HashRecord<u64>;

impl<H: HashValue> HashRecord<H> {
    pub fn new(hash: H, mapping_index: u32, local_store_index: u32, store_id: u32) -> Self {
        Self {
            hash,
            reserved: H::Reserved::default(),
            mapping_index,
            local_store_index,
            store_id,
        }
    }

    pub fn hash_hex(&self) -> String {
        self.hash.to_hex()
    }

    /// Directory slot this entry describes.
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.store_id, self.local_store_index)
    }
}

impl Record for HashRecord<u32> {
    const TABLE: &'static str = "hash32";
    const STRIDE: usize = 20;

    fn decode(raw: &[u8]) -> Self {
        decode_hash_record(raw)
    }

    fn write<W: Write>(&self, writer: W) -> io::Result<()> {
        write_hash_record(self, writer)
    }
}

impl Record for HashRecord<u64> {
    const TABLE: &'static str = "hash64";
    const STRIDE: usize = 20;

    fn decode(raw: &[u8]) -> Self {
        decode_hash_record(raw)
    }

    fn write<W: Write>(&self, writer: W) -> io::Result<()> {
        write_hash_record(self, writer)
    }
}

fn decode_hash_record<H: HashValue>(raw: &[u8]) -> HashRecord<H> {
    let field = |n: usize| {
        let at = HASH_FIELDS_AT + n * 4;
        LittleEndian::read_u32(&raw[at..at + 4])
    };
    let mut reserved = H::Reserved::default();
    reserved.as_mut().copy_from_slice(&raw[H::WIDTH..HASH_FIELDS_AT]);
    HashRecord {
        hash:              H::read(&raw[..H::WIDTH]),
        reserved,
        mapping_index:     field(0),
        local_store_index: field(1),
        store_id:          field(2),
    }
}

fn write_hash_record<H: HashValue, W: Write>(rec: &HashRecord<H>, mut writer: W) -> io::Result<()> {
    rec.hash.write(&mut writer)?;
    writer.write_all(rec.reserved.as_ref())?;
    writer.write_u32::<LittleEndian>(rec.mapping_index)?;
    writer.write_u32::<LittleEndian>(rec.local_store_index)?;
    writer.write_u32::<LittleEndian>(rec.store_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_record_layout() {
        let raw = [
            0x10, 0, 0, 0, 0x05, 0, 0, 0,
            0x20, 0, 0, 0, 0x06, 0, 0, 0,
            0x30, 0, 0, 0, 0x07, 0, 0, 0,
        ];
        let rec = PayloadRecord::decode(&raw);
        assert_eq!(rec.data, Span { offset: 16, size: 5 });
        assert_eq!(rec.debug, Span { offset: 32, size: 6 });
        assert_eq!(rec.config, Span { offset: 48, size: 7 });

        let mut out = Vec::new();
        rec.write(&mut out).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn hash32_reserved_bytes_are_not_fields() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&0xa2e0_939bu32.to_le_bytes());
        raw.extend_from_slice(&[0xFF; 4]);
        raw.extend_from_slice(&3u32.to_le_bytes());
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&7u32.to_le_bytes());

        let rec = Hash32Record::decode(&raw);
        assert_eq!(rec.hash_hex(), "0xa2e0939b");
        assert_eq!(rec.reserved, [0xFF; 4]);
        assert_eq!(rec.mapping_index, 3);
        assert_eq!(rec.local_store_index, 1);
        assert_eq!(rec.store_id, 7);
        assert_eq!(rec.key(), EntryKey::new(7, 1));
    }

    #[test]
    fn hash64_fields_follow_value() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&0x4288_cfb7_49e4_c631u64.to_le_bytes());
        raw.extend_from_slice(&9u32.to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&2u32.to_le_bytes());

        let rec = Hash64Record::decode(&raw);
        assert_eq!(rec.hash_hex(), "0x4288cfb749e4c631");
        assert_eq!(rec.mapping_index, 9);
        assert_eq!(rec.key(), EntryKey::new(2, 0));

        let mut out = Vec::new();
        rec.write(&mut out).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn hex_is_zero_padded() {
        assert_eq!(0x1u32.to_hex(), "0x00000001");
        assert_eq!(0xabu64.to_hex(), "0x00000000000000ab");
    }

    #[test]
    fn hash32_new_zeroes_reserved() {
        let rec = Hash32Record::new(1, 2, 3, 4);
        let mut out = Vec::new();
        rec.write(&mut out).unwrap();
        assert_eq!(out.len(), Hash32Record::STRIDE);
        assert_eq!(&out[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn hash32_reserved_bytes_survive_reencode() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        raw.extend_from_slice(&[0u8; 12]);

        let rec = Hash32Record::decode(&raw);
        assert_eq!(rec.hash, 1);
        assert_eq!(rec.mapping_index, 0);
        let mut out = Vec::new();
        rec.write(&mut out).unwrap();
        assert_eq!(out, raw);
    }
}
