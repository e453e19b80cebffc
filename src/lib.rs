//! # untable
//!
//! PDF table extraction library for Rust.
//!
//! This library detects tables in PDF documents, normalizes them into
//! rectangular header-plus-rows form and serializes them as CSV, with
//! content-hash deduplication so identical documents are processed once.
//!
//! ## Quick Start
//!
//! ```no_run
//! use untable::{ExtractionPipeline, UploadedDocument};
//! use untable::storage::{FsBlobStore, MemoryRecordStore};
//!
//! fn main() -> untable::Result<()> {
//!     let records = MemoryRecordStore::new();
//!     let blobs = FsBlobStore::new("artifacts");
//!     let pipeline = ExtractionPipeline::new(&records, &blobs);
//!
//!     let bytes = std::fs::read("report.pdf")?;
//!     let doc = UploadedDocument::new(bytes, "report.pdf");
//!     let outcome = pipeline.process(&doc)?;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Layered detection**: ruling-line (lattice), text-alignment
//!   (stream) and plain-text grid strategies, tried in order
//! - **Normalization**: header inference, rectangularization, blank
//!   row/column pruning
//! - **Deduplication**: SHA-256 content addressing, duplicate uploads
//!   short-circuit without repeating work
//! - **Artifacts**: CSV output and full error diagnostics, keyed by hash

pub mod detect;
pub mod error;
pub mod hash;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod storage;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, validate_upload, PdfFormat};
pub use error::{Error, Result};
pub use hash::ContentHash;
pub use model::{
    ArtifactLocation, CanonicalTable, ProcessingRecord, ProcessingStatus, RawTable,
    UploadedDocument,
};
pub use normalize::TableNormalizer;
pub use parser::{DetectStrategy, PdfSource, StrategyChain};
pub use pipeline::{ExtractionOutcome, ExtractionPipeline, PipelineOptions};
pub use storage::{ArtifactWriter, BlobStore, RecordStore};

/// Detect and normalize every table in a PDF, without any storage.
///
/// Convenience entry for callers that only want the tables: runs the
/// default strategy chain and normalization, skipping hashing, dedup
/// and artifact writing.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("document.pdf").unwrap();
/// let tables = untable::extract_tables(&data).unwrap();
/// println!("found {} table(s)", tables.len());
/// ```
pub fn extract_tables(data: &[u8]) -> Result<Vec<CanonicalTable>> {
    let source = PdfSource::from_bytes(data)?;
    let outcome = StrategyChain::default().run(&source)?;
    let normalizer = TableNormalizer::new();
    let tables: Vec<CanonicalTable> = outcome
        .tables
        .iter()
        .map(|raw| normalizer.normalize(raw))
        .filter(|t| !t.header.is_empty())
        .collect();
    if tables.is_empty() {
        return Err(Error::NoTablesFound);
    }
    Ok(tables)
}
