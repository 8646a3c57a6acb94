use crate::axml::cursor::Cursor;
use crate::axml::error::{AxmlError, AxmlResult};
use crate::axml::{ChunkHeader, FLAG_UTF8, NO_ENTRY};

/// The decoded string table shared by every chunk that follows it.
///
/// Every element name, attribute name, namespace prefix/URI and raw attribute
/// value in the document is a `u32` index into this table. Strings are decoded
/// eagerly into UTF-8 when the pool chunk is consumed; nothing mutates the
/// pool afterwards.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    /// A pool with no entries. Documents reference it only through the
    /// `0xFFFFFFFF` sentinel; any real index fails.
    pub fn empty() -> Self {
        StringPool::default()
    }

    /// Decodes a `RES_STRING_POOL_TYPE` chunk. The cursor must sit just past
    /// the 8-byte chunk header described by `header`.
    pub(crate) fn parse(cursor: &mut Cursor<'_>, header: &ChunkHeader) -> AxmlResult<StringPool> {
        let string_count = cursor.get_u32()?;
        let style_count = cursor.get_u32()?;
        let flags = cursor.get_u32()?;
        let strings_start = cursor.get_u32()?;
        let _styles_start = cursor.get_u32()?;

        if style_count != 0 {
            return Err(AxmlError::Unsupported("string pool style runs"));
        }
        let utf8 = flags & FLAG_UTF8 != 0;

        // The offset table must fit inside the chunk before we trust its
        // length for allocation.
        let table_bytes = (string_count as u64) * 4;
        if 28 + table_bytes > header.chunk_size as u64 {
            return Err(AxmlError::Malformed(format!(
                "string pool declares {string_count} entries in a {} byte chunk",
                header.chunk_size
            )));
        }

        let mut offsets = Vec::with_capacity(string_count as usize);
        for _ in 0..string_count {
            offsets.push(cursor.get_u32()?);
        }

        // String offsets are relative to the data area at
        // `chunk_start + strings_start`.
        let base = header.start.checked_add(strings_start as usize).ok_or_else(|| {
            AxmlError::Malformed(format!("string data start {strings_start} overflows"))
        })?;
        if base > header.end() {
            return Err(AxmlError::Malformed(format!(
                "string data start {strings_start} lies outside the chunk"
            )));
        }

        let mut strings = Vec::with_capacity(string_count as usize);
        for offset in offsets {
            let at = base.checked_add(offset as usize).filter(|&at| at < header.end());
            let at = at.ok_or_else(|| {
                AxmlError::Malformed(format!("string offset {offset} lies outside the chunk"))
            })?;
            cursor.move_to(at)?;
            let text = if utf8 {
                read_utf8_string(cursor)?
            } else {
                read_utf16_string(cursor)?
            };
            strings.push(text);
        }

        Ok(StringPool { strings })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Resolves an index read from the stream. The `0xFFFFFFFF` sentinel maps
    /// to `None`; any other index must be inside the pool.
    pub fn get(&self, index: u32) -> AxmlResult<Option<&str>> {
        if index == NO_ENTRY {
            return Ok(None);
        }
        match self.strings.get(index as usize) {
            Some(s) => Ok(Some(s.as_str())),
            None => Err(AxmlError::Malformed(format!(
                "string index {index} out of range ({} entries)",
                self.strings.len()
            ))),
        }
    }

    /// Resolves an index that the stream is not allowed to leave absent.
    pub fn require(&self, index: u32) -> AxmlResult<&str> {
        self.get(index)?.ok_or_else(|| {
            AxmlError::Malformed("required string index is absent".to_string())
        })
    }
}

/// Decodes a length prefix in the UTF-8 flavour: one byte, or two when the
/// high bit of the first is set (`((first & 0x7F) << 8) | second`).
fn read_utf8_length(cursor: &mut Cursor<'_>) -> AxmlResult<usize> {
    let first = cursor.get_u8()? as usize;
    if first & 0x80 == 0 {
        return Ok(first);
    }
    let second = cursor.get_u8()? as usize;
    Ok(((first & 0x7F) << 8) | second)
}

/// Decodes a length prefix in the UTF-16 flavour: one code unit, or two when
/// the high bit of the first is set, combining into 31 bits.
fn read_utf16_length(cursor: &mut Cursor<'_>) -> AxmlResult<usize> {
    let first = cursor.get_u16()? as usize;
    if first & 0x8000 == 0 {
        return Ok(first);
    }
    let second = cursor.get_u16()? as usize;
    Ok(((first & 0x7FFF) << 16) | second)
}

/// A UTF-8 record: character count (unused), byte length, bytes, NUL.
fn read_utf8_string(cursor: &mut Cursor<'_>) -> AxmlResult<String> {
    let _char_count = read_utf8_length(cursor)?;
    let byte_len = read_utf8_length(cursor)?;
    let bytes = cursor.get_c_str()?;
    if bytes.len() != byte_len {
        return Err(AxmlError::Malformed(format!(
            "UTF-8 string declares {byte_len} bytes but terminates after {}",
            bytes.len()
        )));
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(err) => Err(AxmlError::InvalidEncoding(err.to_string())),
    }
}

/// A UTF-16 record: code-unit count, units, `0x0000` terminator.
fn read_utf16_string(cursor: &mut Cursor<'_>) -> AxmlResult<String> {
    let unit_count = read_utf16_length(cursor)?;
    let byte_len = unit_count.checked_mul(2).ok_or_else(|| {
        AxmlError::Malformed(format!("UTF-16 length {unit_count} overflows"))
    })?;
    let raw = cursor.get_bytes(byte_len)?;
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    if cursor.get_u16()? != 0 {
        return Err(AxmlError::Malformed(
            "UTF-16 string missing terminator".to_string(),
        ));
    }
    String::from_utf16(&units).map_err(|err| AxmlError::InvalidEncoding(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axml::{read_chunk_header, RES_STRING_POOL_TYPE};

    fn u16le(buf: &mut Vec<u8>, value: u16) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn u32le(buf: &mut Vec<u8>, value: u32) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Assembles a pool chunk from pre-encoded string records.
    fn pool_chunk(records: &[Vec<u8>], flags: u32, style_count: u32) -> Vec<u8> {
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        for record in records {
            offsets.push(data.len() as u32);
            data.extend_from_slice(record);
        }
        let mut chunk = Vec::new();
        u16le(&mut chunk, RES_STRING_POOL_TYPE);
        u16le(&mut chunk, 28);
        u32le(&mut chunk, 0); // patched below
        u32le(&mut chunk, records.len() as u32);
        u32le(&mut chunk, style_count);
        u32le(&mut chunk, flags);
        u32le(&mut chunk, 28 + 4 * records.len() as u32);
        u32le(&mut chunk, 0);
        for offset in offsets {
            u32le(&mut chunk, offset);
        }
        chunk.extend_from_slice(&data);
        let size = chunk.len() as u32;
        chunk[4..8].copy_from_slice(&size.to_le_bytes());
        chunk
    }

    fn utf16_record(text: &str) -> Vec<u8> {
        let mut record = Vec::new();
        let units: Vec<u16> = text.encode_utf16().collect();
        u16le(&mut record, units.len() as u16);
        for unit in units {
            u16le(&mut record, unit);
        }
        u16le(&mut record, 0);
        record
    }

    fn utf8_record(text: &str) -> Vec<u8> {
        let mut record = vec![text.chars().count() as u8, text.len() as u8];
        record.extend_from_slice(text.as_bytes());
        record.push(0);
        record
    }

    fn parse(chunk: &[u8]) -> AxmlResult<StringPool> {
        let mut cursor = Cursor::new(chunk);
        let header = read_chunk_header(&mut cursor)?;
        StringPool::parse(&mut cursor, &header)
    }

    #[test]
    fn utf16_pool() {
        let chunk = pool_chunk(
            &[utf16_record("manifest"), utf16_record(""), utf16_record("päckage")],
            0,
            0,
        );
        let pool = parse(&chunk).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.require(0).unwrap(), "manifest");
        assert_eq!(pool.require(1).unwrap(), "");
        assert_eq!(pool.require(2).unwrap(), "päckage");
    }

    #[test]
    fn utf8_pool() {
        let chunk = pool_chunk(
            &[utf8_record("application"), utf8_record("")],
            FLAG_UTF8,
            0,
        );
        let pool = parse(&chunk).unwrap();
        assert_eq!(pool.require(0).unwrap(), "application");
        assert_eq!(pool.require(1).unwrap(), "");
    }

    #[test]
    fn utf16_extended_length() {
        // High-bit form: 0x8000 | 0 high units, then 3 in the second word.
        let mut record = Vec::new();
        u16le(&mut record, 0x8000);
        u16le(&mut record, 3);
        for unit in "abc".encode_utf16() {
            u16le(&mut record, unit);
        }
        u16le(&mut record, 0);
        let chunk = pool_chunk(&[record], 0, 0);
        let pool = parse(&chunk).unwrap();
        assert_eq!(pool.require(0).unwrap(), "abc");
    }

    #[test]
    fn utf8_extended_length() {
        // Two-byte byte-length: 0x80 | high bits, then the low byte.
        let text = "xy";
        let mut record = vec![text.len() as u8, 0x80, text.len() as u8];
        record.extend_from_slice(text.as_bytes());
        record.push(0);
        let chunk = pool_chunk(&[record], FLAG_UTF8, 0);
        let pool = parse(&chunk).unwrap();
        assert_eq!(pool.require(0).unwrap(), "xy");
    }

    #[test]
    fn empty_pool() {
        let chunk = pool_chunk(&[], 0, 0);
        let pool = parse(&chunk).unwrap();
        assert!(pool.is_empty());
        assert_eq!(pool.get(NO_ENTRY).unwrap(), None);
        assert!(pool.get(0).is_err());
    }

    #[test]
    fn style_runs_are_unsupported() {
        let chunk = pool_chunk(&[utf16_record("x")], 0, 1);
        assert!(matches!(
            parse(&chunk),
            Err(AxmlError::Unsupported("string pool style runs"))
        ));
    }

    #[test]
    fn length_mismatch_is_malformed() {
        // Byte length 5, but the NUL arrives after 2 bytes.
        let record = vec![2, 5, b'h', b'i', 0];
        let chunk = pool_chunk(&[record], FLAG_UTF8, 0);
        assert!(matches!(parse(&chunk), Err(AxmlError::Malformed(_))));
    }

    #[test]
    fn missing_utf16_terminator_is_malformed() {
        let mut record = Vec::new();
        u16le(&mut record, 1);
        u16le(&mut record, b'a' as u16);
        u16le(&mut record, b'!' as u16); // not a terminator
        let chunk = pool_chunk(&[record], 0, 0);
        assert!(matches!(parse(&chunk), Err(AxmlError::Malformed(_))));
    }

    #[test]
    fn invalid_utf8_is_encoding_error() {
        let record = vec![1, 2, 0xC3, 0x28, 0]; // overlong / stray continuation
        let chunk = pool_chunk(&[record], FLAG_UTF8, 0);
        assert!(matches!(parse(&chunk), Err(AxmlError::InvalidEncoding(_))));
    }

    #[test]
    fn oversized_count_is_malformed() {
        let mut chunk = pool_chunk(&[], 0, 0);
        // Claim far more entries than the chunk can hold.
        chunk[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(parse(&chunk), Err(AxmlError::Malformed(_))));
    }

    #[test]
    fn offset_outside_chunk_is_malformed() {
        let mut chunk = pool_chunk(&[utf16_record("a")], 0, 0);
        // Redirect the single offset past the end of the chunk.
        let offset_at = 28;
        chunk[offset_at..offset_at + 4].copy_from_slice(&0x1000u32.to_le_bytes());
        assert!(matches!(parse(&chunk), Err(AxmlError::Malformed(_))));
    }
}
