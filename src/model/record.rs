//! Processing records and artifact locations.
//!
//! The record is the data the external persistence collaborator stores per
//! content hash. The core produces it at the pipeline's terminal state; it
//! does not own the record's lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Location of a stored artifact, as returned by the blob store.
///
/// Content-addressed: derived deterministically from the content hash
/// (e.g. `csv/{hash}.csv`, `errors/{hash}.txt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactLocation(String);

impl ArtifactLocation {
    /// Wrap a store-relative path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The store-relative path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one pipeline invocation, keyed by content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRecord {
    /// Dedup key: content hash of the uploaded document.
    pub hash: ContentHash,

    /// Declared filename of the upload that produced this record.
    pub filename: String,

    /// Location of the cleaned CSV artifact, when extraction succeeded.
    pub csv: Option<ArtifactLocation>,

    /// Location of the diagnostic artifact, when extraction failed.
    pub error: Option<ArtifactLocation>,

    /// When the pipeline reached its terminal state.
    pub extracted_at: DateTime<Utc>,
}

impl ProcessingRecord {
    /// Record for a successful extraction.
    pub fn complete(hash: ContentHash, filename: impl Into<String>, csv: ArtifactLocation) -> Self {
        Self {
            hash,
            filename: filename.into(),
            csv: Some(csv),
            error: None,
            extracted_at: Utc::now(),
        }
    }

    /// Record for a failed extraction, optionally referencing a persisted
    /// diagnostic artifact.
    pub fn failed(
        hash: ContentHash,
        filename: impl Into<String>,
        error: Option<ArtifactLocation>,
    ) -> Self {
        Self {
            hash,
            filename: filename.into(),
            csv: None,
            error,
            extracted_at: Utc::now(),
        }
    }

    /// Derive the processing status from the record's fields.
    pub fn status(&self) -> ProcessingStatus {
        if self.csv.is_some() {
            ProcessingStatus::Complete
        } else if self.error.is_some() {
            ProcessingStatus::Failed
        } else {
            ProcessingStatus::InProgress
        }
    }
}

/// Status of a processed document, derived from its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStatus {
    /// CSV artifact exists.
    Complete,
    /// Error artifact exists but no CSV.
    Failed,
    /// Neither artifact exists yet.
    InProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        let hash = ContentHash::of_bytes(b"doc");
        let csv = ArtifactLocation::new("csv/abc.csv");
        let err = ArtifactLocation::new("errors/abc.txt");

        let record = ProcessingRecord::complete(hash.clone(), "a.pdf", csv);
        assert_eq!(record.status(), ProcessingStatus::Complete);

        let record = ProcessingRecord::failed(hash.clone(), "a.pdf", Some(err));
        assert_eq!(record.status(), ProcessingStatus::Failed);

        let record = ProcessingRecord::failed(hash, "a.pdf", None);
        assert_eq!(record.status(), ProcessingStatus::InProgress);
    }

    #[test]
    fn test_record_serialization_round_trip() {
        let record = ProcessingRecord::complete(
            ContentHash::of_bytes(b"doc"),
            "report.pdf",
            ArtifactLocation::new("csv/abc.csv"),
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: ProcessingRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hash, record.hash);
        assert_eq!(back.csv, record.csv);
        assert_eq!(back.status(), ProcessingStatus::Complete);
    }
}
