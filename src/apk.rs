//! Extraction of `AndroidManifest.xml` from APK (ZIP) archives.

use std::fmt;
use std::io::{self, Read};

use zip::read::ZipArchive;
use zip::result::ZipError;

/// Name of the manifest entry inside every APK.
pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";

/// Result alias for APK operations.
pub type ApkResult<T> = Result<T, ApkError>;

/// Errors surfaced while pulling the manifest out of an archive.
#[derive(Debug)]
pub enum ApkError {
    Io(io::Error),
    Zip(ZipError),
    /// The archive opened fine but contains no `AndroidManifest.xml`.
    MissingManifest,
}

impl fmt::Display for ApkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApkError::Io(err) => write!(f, "I/O error: {err}"),
            ApkError::Zip(err) => write!(f, "ZIP error: {err}"),
            ApkError::MissingManifest => {
                write!(f, "{MANIFEST_ENTRY} is not found in APK")
            }
        }
    }
}

impl std::error::Error for ApkError {}

impl From<io::Error> for ApkError {
    fn from(value: io::Error) -> Self {
        ApkError::Io(value)
    }
}

impl From<ZipError> for ApkError {
    fn from(value: ZipError) -> Self {
        ApkError::Zip(value)
    }
}

/// Locates and inflates the manifest entry of an APK held in memory.
pub fn extract_manifest(data: &[u8]) -> ApkResult<Vec<u8>> {
    let mut archive = ZipArchive::new(io::Cursor::new(data))?;
    let mut entry = match archive.by_name(MANIFEST_ENTRY) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(ApkError::MissingManifest),
        Err(err) => return Err(ApkError::Zip(err)),
    };
    let mut content = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut content)?;
    Ok(content)
}
