//! Uploaded document representation.

/// An uploaded document: raw bytes plus the declared filename.
///
/// Transient — exists only for the duration of one pipeline invocation.
/// The filename never influences the content hash; it is kept for
/// validation and diagnostics only.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    bytes: Vec<u8>,
    filename: String,
}

impl UploadedDocument {
    /// Create a document from owned bytes and a declared filename.
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }

    /// The raw document bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The declared filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Document size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The lowercase filename extension, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}
