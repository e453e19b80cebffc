//! PDF access and table detection.

mod lattice;
mod layout;
mod strategy;
mod stream;
mod textgrid;

pub use lattice::LatticeDetector;
pub use layout::{extract_page_spans, TextSpan};
pub use strategy::{default_strategies, ChainOutcome, DetectStrategy, StrategyChain};
pub use stream::{StreamConfig, StreamDetector};
pub use textgrid::TextGridDetector;

use lopdf::Document as LopdfDocument;

use crate::detect::detect_format_from_bytes;
use crate::error::{Error, Result};
use crate::model::UploadedDocument;

/// A parsed PDF document shared by all detection strategies.
///
/// Parsing happens once per pipeline invocation; every strategy in the
/// fallback chain works from the same source. The raw bytes are retained
/// for the secondary text-extraction engine.
pub struct PdfSource {
    doc: LopdfDocument,
    bytes: Vec<u8>,
}

impl PdfSource {
    /// Parse a PDF from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        detect_format_from_bytes(data)?;

        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;

        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }

        Ok(Self {
            doc,
            bytes: data.to_vec(),
        })
    }

    /// Parse an uploaded document.
    pub fn from_document(document: &UploadedDocument) -> Result<Self> {
        Self::from_bytes(document.bytes())
    }

    /// The underlying lopdf document.
    pub fn doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// The raw PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Page numbers in document order (1-based).
    pub fn page_numbers(&self) -> Vec<u32> {
        self.doc.get_pages().keys().copied().collect()
    }

    #[cfg(test)]
    pub(crate) fn empty_for_tests() -> Self {
        Self {
            doc: LopdfDocument::with_version("1.5"),
            bytes: Vec::new(),
        }
    }
}
