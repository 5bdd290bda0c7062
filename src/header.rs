//! Fixed 20-byte store header.
//!
//! ```text
//! [0,4)   magic          "XABA"
//! [4,8)   version        u32 LE, must be <= FORMAT_VERSION
//! [8,12)  local count    u32 LE, entries in this store
//! [12,16) global count   u32 LE, entries across all stores (opaque)
//! [16,20) store id       u32 LE
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{self, Write};
use thiserror::Error;

pub const MAGIC: &[u8; 4] = b"XABA";
/// Highest format version this reader understands.
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 20;

/// Container-level decode failure.  Fatal for the whole store: nothing is
/// extracted once one of these is returned.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("bad magic: {0:02x?}")]
    BadMagic([u8; 4]),
    #[error("unsupported version: {0} (highest known {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
    #[error("truncated header: {available} of {HEADER_SIZE} bytes")]
    TruncatedHeader { available: usize },
    #[error("truncated table '{table}': need {needed} bytes, {available} available")]
    TruncatedTable {
        table:     &'static str,
        needed:    usize,
        available: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    pub magic:        [u8; 4],
    pub version:      u32,
    pub local_count:  u32,
    pub global_count: u32,
    pub store_id:     u32,
}

impl StoreHeader {
    pub fn new(local_count: u32, global_count: u32, store_id: u32) -> Self {
        Self {
            magic: *MAGIC,
            version: FORMAT_VERSION,
            local_count,
            global_count,
            store_id,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.local_count)?;
        writer.write_u32::<LittleEndian>(self.global_count)?;
        writer.write_u32::<LittleEndian>(self.store_id)?;
        Ok(())
    }

    /// Decode the header from the start of `buf`.  Only the first
    /// [`HEADER_SIZE`] bytes are inspected.
    pub fn decode(buf: &[u8]) -> Result<Self, FormatError> {
        if buf.len() < HEADER_SIZE {
            return Err(FormatError::TruncatedHeader { available: buf.len() });
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if &magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }
        let version = LittleEndian::read_u32(&buf[4..8]);
        if version > FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        Ok(Self {
            magic,
            version,
            local_count:  LittleEndian::read_u32(&buf[8..12]),
            global_count: LittleEndian::read_u32(&buf[12..16]),
            store_id:     LittleEndian::read_u32(&buf[16..20]),
        })
    }

    /// Magic as text for display; non-ASCII tags fall back to hex.
    pub fn magic_str(&self) -> String {
        match std::str::from_utf8(&self.magic) {
            Ok(s) if s.chars().all(|c| c.is_ascii_graphic()) => s.to_owned(),
            _ => hex::encode(self.magic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [u8; 20] = [
        0x58, 0x41, 0x42, 0x41, 0x01, 0x00, 0x00, 0x00,
        0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00,
        0x07, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn decodes_sample_header() {
        let h = StoreHeader::decode(&SAMPLE).unwrap();
        assert_eq!(h.magic_str(), "XABA");
        assert_eq!(h.version, 1);
        assert_eq!(h.local_count, 2);
        assert_eq!(h.global_count, 2);
        assert_eq!(h.store_id, 7);
    }

    #[test]
    fn write_reproduces_bytes() {
        let h = StoreHeader::decode(&SAMPLE).unwrap();
        let mut out = Vec::new();
        h.write(&mut out).unwrap();
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = SAMPLE;
        buf[0] = b'Z';
        assert_eq!(
            StoreHeader::decode(&buf),
            Err(FormatError::BadMagic(*b"ZABA"))
        );
    }

    #[test]
    fn rejects_newer_version() {
        let mut buf = SAMPLE;
        buf[4] = 2;
        assert_eq!(StoreHeader::decode(&buf), Err(FormatError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(
            StoreHeader::decode(&SAMPLE[..19]),
            Err(FormatError::TruncatedHeader { available: 19 })
        );
        assert_eq!(
            StoreHeader::decode(&[]),
            Err(FormatError::TruncatedHeader { available: 0 })
        );
    }

    #[test]
    fn magic_str_falls_back_to_hex() {
        let mut h = StoreHeader::new(0, 0, 0);
        h.magic = [0x00, 0xff, 0x10, 0x41];
        assert_eq!(h.magic_str(), "00ff1041");
    }
}
