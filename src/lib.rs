//! # axmldec
//!
//! A decoder for Android binary XML (AXML), the chunked representation of
//! `AndroidManifest.xml` and other resource XML inside APK archives.
//!
//! The crate accepts three kinds of input and routes them by the first byte:
//! binary XML documents (`0x03`), APK archives (`P`, from the ZIP magic), and
//! plain textual XML (anything else). All three paths produce the same
//! [`XmlTree`], which serializes back to readable XML through
//! [`text_xml::write_document`].
//!
//! ```no_run
//! let tree = axmldec::decode_file("AndroidManifest.xml")?;
//! let xml = axmldec::text_xml::write_document(&tree)?;
//! println!("{xml}");
//! # Ok::<(), axmldec::Error>(())
//! ```

pub mod apk;
pub mod axml;
pub mod text_xml;
pub mod types;

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use log::debug;

use crate::apk::ApkError;
use crate::axml::error::AxmlError;
use crate::text_xml::TextXmlError;
use crate::types::XmlTree;

/// Result alias for top-level decoding.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure from the decoding pipeline.
#[derive(Debug)]
pub enum Error {
    Axml(AxmlError),
    Text(TextXmlError),
    Apk(ApkError),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Axml(err) => write!(f, "{err}"),
            Error::Text(err) => write!(f, "{err}"),
            Error::Apk(err) => write!(f, "{err}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<AxmlError> for Error {
    fn from(value: AxmlError) -> Self {
        Error::Axml(value)
    }
}

impl From<TextXmlError> for Error {
    fn from(value: TextXmlError) -> Self {
        Error::Text(value)
    }
}

impl From<ApkError> for Error {
    fn from(value: ApkError) -> Self {
        Error::Apk(value)
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value)
    }
}

/// How an input buffer is routed, keyed off its first byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Binary AXML: the outer `RES_XML_TYPE` chunk starts with `0x03`.
    BinaryXml,
    /// A ZIP archive: the local-file-header magic starts with ASCII `P`.
    Apk,
    /// Anything else is treated as plain textual XML.
    TextXml,
}

/// Classifies an input buffer by its leading byte.
pub fn classify(data: &[u8]) -> InputKind {
    match data.first() {
        Some(0x03) => InputKind::BinaryXml,
        Some(b'P') => InputKind::Apk,
        _ => InputKind::TextXml,
    }
}

/// Decodes an in-memory input of any supported kind into an [`XmlTree`].
pub fn decode_bytes(data: &[u8]) -> Result<XmlTree> {
    match classify(data) {
        InputKind::Apk => {
            let manifest = apk::extract_manifest(data)?;
            decode_axml_with_fallback(&manifest)
        }
        InputKind::BinaryXml => decode_axml_with_fallback(data),
        InputKind::TextXml => Ok(text_xml::parse_document(as_utf8(data)?)?),
    }
}

/// Reads `path` and decodes it with [`decode_bytes`].
pub fn decode_file(path: impl AsRef<Path>) -> Result<XmlTree> {
    let data = fs::read(path)?;
    decode_bytes(&data)
}

/// Runs the binary decoder; when it reports that the input is simply not
/// binary XML, re-parses the input as text instead.
fn decode_axml_with_fallback(data: &[u8]) -> Result<XmlTree> {
    let mut tree = XmlTree::new();
    match axml::decode(data, &mut tree) {
        Ok(()) => Ok(tree),
        Err(err) if err.is_magic_mismatch() => {
            debug!("{err}; retrying as textual XML");
            Ok(text_xml::parse_document(as_utf8(data)?)?)
        }
        Err(err) => Err(Error::Axml(err)),
    }
}

fn as_utf8(data: &[u8]) -> Result<&str> {
    std::str::from_utf8(data)
        .map_err(|err| Error::Text(TextXmlError::Malformed(err.to_string())))
}
