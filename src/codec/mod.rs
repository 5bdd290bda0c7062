//! Compressed-block detection and inflation.
//!
//! A payload is either stored verbatim or as a compressed block:
//!
//! ```text
//! [ "XALZ" (4 B) | LZ4 frame ... ]
//! ```
//!
//! The tag is the only signal; there is no length prefix and no declared
//! uncompressed size, so the frame is inflated into a growing buffer.
//! Raw payloads are handed back as a borrow of the input slice.

use std::borrow::Cow;
use std::io::Read;
use thiserror::Error;

pub const COMPRESSED_MAGIC: &[u8; 4] = b"XALZ";

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("decompression failed: {0}")]
    Decompression(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Stored verbatim.
    Raw,
    /// Tagged with [`COMPRESSED_MAGIC`], LZ4 frame follows.
    Lz4Frame,
}

impl Encoding {
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(COMPRESSED_MAGIC) {
            Encoding::Lz4Frame
        } else {
            Encoding::Raw
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::Raw      => "raw",
            Encoding::Lz4Frame => "lz4",
        }
    }
}

/// Decode one payload slice.  Raw payloads are returned without copying.
pub fn decode_payload(data: &[u8]) -> Result<Cow<'_, [u8]>, CodecError> {
    match Encoding::detect(data) {
        Encoding::Raw      => Ok(Cow::Borrowed(data)),
        Encoding::Lz4Frame => inflate(&data[COMPRESSED_MAGIC.len()..]).map(Cow::Owned),
    }
}

/// Inflate a complete LZ4 frame stream.
pub fn inflate(stream: &[u8]) -> Result<Vec<u8>, CodecError> {
    if stream.is_empty() {
        return Err(CodecError::Decompression("no frame after block tag".into()));
    }
    let mut out = Vec::with_capacity(stream.len().saturating_mul(2));
    lz4_flex::frame::FrameDecoder::new(stream)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompression(e.to_string()))?;
    Ok(out)
}
