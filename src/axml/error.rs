use std::fmt;

/// Result alias for binary XML decoding.
pub type AxmlResult<T> = Result<T, AxmlError>;

/// Errors surfaced by the binary XML decoder.
///
/// Every variant carries enough context to report where in the input the
/// decode failed. All variants are fatal to the decode call; only
/// [`AxmlError::MagicMismatch`] is intended to be caught by callers, as the
/// signal to re-parse the input as textual XML.
#[derive(Debug, PartialEq, Eq)]
pub enum AxmlError {
    /// The outer chunk type is not `RES_XML_TYPE` (0x0003).
    MagicMismatch { found: u16 },
    /// A read would extend past the end of the buffer, or a chunk's declared
    /// size exceeds the remaining buffer.
    Truncated { at: usize, needed: usize },
    /// Internally inconsistent structure (offsets, counts, terminators).
    Malformed(String),
    /// UTF-8 or UTF-16 string data failed to decode.
    InvalidEncoding(String),
    /// A feature the decoder deliberately does not implement.
    Unsupported(&'static str),
    /// A chunk type that is neither recognised nor safely skippable.
    UnknownChunk { chunk_type: u16, at: usize },
    /// Attribute-name recovery addressed a slot outside the resource map or
    /// the built-in framework attribute table.
    UndefinedAttr { index: u32 },
}

impl AxmlError {
    /// True when the input is simply not binary XML, as opposed to damaged
    /// binary XML. Callers use this to fall back to a textual XML parse.
    pub fn is_magic_mismatch(&self) -> bool {
        matches!(self, AxmlError::MagicMismatch { .. })
    }
}

impl fmt::Display for AxmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxmlError::MagicMismatch { found } => {
                write!(f, "not a binary XML file (outer chunk type 0x{found:04x})")
            }
            AxmlError::Truncated { at, needed } => {
                write!(f, "unexpected end of input at offset {at} ({needed} bytes required)")
            }
            AxmlError::Malformed(msg) => write!(f, "malformed binary XML: {msg}"),
            AxmlError::InvalidEncoding(msg) => write!(f, "string decoding failed: {msg}"),
            AxmlError::Unsupported(feature) => {
                write!(f, "unsupported binary XML feature: {feature}")
            }
            AxmlError::UnknownChunk { chunk_type, at } => {
                write!(f, "unknown chunk type 0x{chunk_type:04x} at offset {at}")
            }
            AxmlError::UndefinedAttr { index } => {
                write!(f, "undefined attribute name for index {index}")
            }
        }
    }
}

impl std::error::Error for AxmlError {}
