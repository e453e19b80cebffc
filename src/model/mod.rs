//! Data model for the extraction pipeline.
//!
//! This module defines the intermediate representation that bridges table
//! detection and artifact serialization: the transient uploaded document,
//! the raw (unvalidated) detected grid, the canonical rectangular table,
//! and the processing record produced for external persistence.

mod document;
mod record;
mod table;

pub use document::UploadedDocument;
pub use record::{ArtifactLocation, ProcessingRecord, ProcessingStatus};
pub use table::{CanonicalTable, RawTable};
pub(crate) use table::row_is_blank;
