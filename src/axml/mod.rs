//! Decoder for Android binary XML (AXML) documents.
//!
//! AXML is the chunked, length-prefixed encoding used for
//! `AndroidManifest.xml` and other resource XML inside APK archives. A
//! document is one outer `RES_XML_TYPE` chunk whose payload tiles a string
//! pool, an optional resource map and a stream of node chunks. The decoder
//! walks that stream and reconstructs the element tree through the
//! [`TreeSink`](crate::types::TreeSink) contract.
//!
//! The decoder is defensive: every index, offset and length read from the
//! input is validated against the buffer bounds before use, so truncated or
//! hostile documents fail with a typed [`AxmlError`](error::AxmlError)
//! instead of reading out of range.

pub mod error;

mod attr_names;
mod cursor;
mod parser;
mod string_pool;
mod value;

pub use cursor::Cursor;
pub use parser::decode;
pub use string_pool::StringPool;
pub use value::ResValue;

use error::{AxmlError, AxmlResult};

pub(crate) const RES_STRING_POOL_TYPE: u16 = 0x0001;
pub(crate) const RES_XML_TYPE: u16 = 0x0003;
pub(crate) const RES_XML_START_NAMESPACE_TYPE: u16 = 0x0100;
pub(crate) const RES_XML_END_NAMESPACE_TYPE: u16 = 0x0101;
pub(crate) const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
pub(crate) const RES_XML_END_ELEMENT_TYPE: u16 = 0x0103;
pub(crate) const RES_XML_CDATA_TYPE: u16 = 0x0104;
pub(crate) const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;

/// Sentinel string-pool index meaning "absent".
pub(crate) const NO_ENTRY: u32 = 0xFFFF_FFFF;

/// String pool flag bit: entries are encoded as UTF-8 rather than UTF-16.
pub(crate) const FLAG_UTF8: u32 = 1 << 8;

/// The 8-byte header that frames every chunk.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChunkHeader {
    pub chunk_type: u16,
    pub header_size: u16,
    pub chunk_size: u32,
    /// Buffer offset the header was read from.
    pub start: usize,
}

impl ChunkHeader {
    /// One past the last byte of the chunk.
    pub fn end(&self) -> usize {
        self.start + self.chunk_size as usize
    }

    /// First byte of the payload that follows the header proper.
    pub fn payload_start(&self) -> usize {
        self.start + self.header_size as usize
    }

    /// Validates the declared sizes against each other and against the
    /// buffer. Kept separate from [`read_chunk_header`] so the outer header's
    /// type can be inspected before its sizes are trusted; a wrong type must
    /// surface as [`AxmlError::MagicMismatch`], not as a framing error.
    pub fn check_bounds(&self, limit: usize) -> AxmlResult<()> {
        if self.header_size < 8 || (self.chunk_size as usize) < self.header_size as usize {
            return Err(AxmlError::Malformed(format!(
                "chunk at offset {} declares header size {} and total size {}",
                self.start, self.header_size, self.chunk_size
            )));
        }
        if self.end() > limit {
            return Err(AxmlError::Truncated {
                at: self.start,
                needed: self.end() - limit,
            });
        }
        Ok(())
    }
}

/// Reads a chunk header, leaving the cursor on the first byte after it.
pub(crate) fn read_chunk_header(cursor: &mut Cursor<'_>) -> AxmlResult<ChunkHeader> {
    let start = cursor.position();
    let chunk_type = cursor.get_u16()?;
    let header_size = cursor.get_u16()?;
    let chunk_size = cursor.get_u32()?;
    Ok(ChunkHeader {
        chunk_type,
        header_size,
        chunk_size,
        start,
    })
}
