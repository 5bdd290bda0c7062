//! Fixed-stride record tables.
//!
//! A store carries three tables back to back after the header, each holding
//! `local_count` records: the payload directory, then the 32-bit hash index,
//! then the 64-bit hash index.  The order is part of the format.  Every table
//! shares one iteration skeleton; only the stride and the per-record field
//! layout differ, which is what [`Record`] abstracts.

use std::io::{self, Write};

use crate::header::FormatError;

/// One fixed-size record shape.
pub trait Record: Sized {
    /// Table name used in diagnostics.
    const TABLE: &'static str;
    /// Size of one encoded record in bytes.
    const STRIDE: usize;

    /// Decode from exactly `STRIDE` bytes.
    fn decode(raw: &[u8]) -> Self;

    /// Encode to exactly `STRIDE` bytes.
    fn write<W: Write>(&self, writer: W) -> io::Result<()>;
}

/// Cursor over a fully-buffered store that hands out consecutive tables.
#[derive(Debug)]
pub struct TableCursor<'a> {
    buf:    &'a [u8],
    offset: usize,
}

impl<'a> TableCursor<'a> {
    pub fn new(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    /// Absolute offset of the next table.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Decode `count` records of shape `R` starting at the current offset and
    /// advance by exactly `count * R::STRIDE`.
    ///
    /// The bounds check happens before any record is decoded, so a truncated
    /// table never yields a partial result.
    pub fn read_table<R: Record>(&mut self, count: u32) -> Result<Vec<R>, FormatError> {
        let available = self.buf.len().saturating_sub(self.offset);
        let truncated = || FormatError::TruncatedTable {
            table: R::TABLE,
            needed: (count as usize).saturating_mul(R::STRIDE),
            available,
        };
        let needed = (count as usize)
            .checked_mul(R::STRIDE)
            .ok_or_else(truncated)?;
        if needed > available {
            return Err(truncated());
        }

        let end = self.offset + needed;
        let records = self.buf[self.offset..end]
            .chunks_exact(R::STRIDE)
            .map(R::decode)
            .collect();
        self.offset = end;
        Ok(records)
    }
}

/// Encode a whole table in order.
pub fn write_table<R: Record, W: Write>(records: &[R], mut writer: W) -> io::Result<()> {
    for record in records {
        record.write(&mut writer)?;
    }
    Ok(())
}
