//! Extraction pipeline orchestration.
//!
//! One invocation per uploaded document: hash the bytes, short-circuit on
//! a known hash, detect tables, normalize the first one, write the CSV
//! artifact and record the outcome. Failures during detection,
//! normalization or writing are caught and persisted as error artifacts
//! rather than propagated; only storage failures on the failure path
//! itself escape.

use crate::detect::validate_upload;
use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::model::{ArtifactLocation, CanonicalTable, ProcessingRecord, UploadedDocument};
use crate::normalize::TableNormalizer;
use crate::parser::{PdfSource, StrategyChain};
use crate::storage::{ArtifactWriter, BlobStore, InsertOutcome, RecordStore};

/// Pipeline tuning options.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Persist every detected table, not just the first. Extra tables go
    /// to `csv/{hash}_{index}.csv`; the record references the first.
    pub persist_all_tables: bool,
}

/// Terminal result of one pipeline invocation.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// A table was extracted and its CSV artifact stored.
    Success {
        hash: ContentHash,
        /// Name of the detection strategy that found the tables.
        strategy: String,
        table: CanonicalTable,
        artifact: ArtifactLocation,
    },
    /// Identical content was already processed; nothing was repeated.
    Duplicate {
        hash: ContentHash,
        record: ProcessingRecord,
    },
    /// Extraction failed; the diagnostic artifact holds the full detail.
    ///
    /// `Error::NoTablesFound` is the expected no-result case and carries
    /// no diagnostic artifact.
    Failed {
        hash: ContentHash,
        error: Error,
        diagnostic: Option<ArtifactLocation>,
    },
}

/// Orchestrates hash, dedup, detection, normalization and storage.
pub struct ExtractionPipeline<'a> {
    records: &'a dyn RecordStore,
    blobs: &'a dyn BlobStore,
    chain: StrategyChain,
    normalizer: TableNormalizer,
    options: PipelineOptions,
}

impl<'a> ExtractionPipeline<'a> {
    /// Pipeline with the default strategy chain and options.
    pub fn new(records: &'a dyn RecordStore, blobs: &'a dyn BlobStore) -> Self {
        Self {
            records,
            blobs,
            chain: StrategyChain::default(),
            normalizer: TableNormalizer::new(),
            options: PipelineOptions::default(),
        }
    }

    /// Replace the detection strategy chain.
    pub fn with_chain(mut self, chain: StrategyChain) -> Self {
        self.chain = chain;
        self
    }

    /// Set pipeline options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Process one uploaded document end to end.
    ///
    /// Returns `Err` only for invalid uploads and for storage failures
    /// that prevent recording the outcome; every extraction-level failure
    /// becomes an [`ExtractionOutcome::Failed`].
    pub fn process(&self, doc: &UploadedDocument) -> Result<ExtractionOutcome> {
        validate_upload(doc.filename(), doc.size())?;

        let hash = ContentHash::of_bytes(doc.bytes());
        log::debug!("processing '{}' as {}", doc.filename(), hash.short());

        if let Some(record) = self.records.find(&hash)? {
            log::debug!("{}: duplicate content, short-circuiting", hash.short());
            return Ok(ExtractionOutcome::Duplicate { hash, record });
        }

        match self.extract(doc) {
            Ok((strategy, tables)) => self.succeed(doc, hash, strategy, tables),
            Err(error) => self.fail(doc, hash, error),
        }
    }

    /// Detection and normalization stages.
    fn extract(&self, doc: &UploadedDocument) -> Result<(String, Vec<CanonicalTable>)> {
        let source = PdfSource::from_document(doc)?;
        let outcome = self.chain.run(&source)?;

        let tables: Vec<CanonicalTable> = outcome
            .tables
            .iter()
            .map(|raw| self.normalizer.normalize(raw))
            .filter(|t| !t.header.is_empty())
            .collect();

        if tables.is_empty() {
            // Detected regions normalized away to nothing
            return Err(Error::NoTablesFound);
        }
        Ok((outcome.strategy, tables))
    }

    /// Write artifacts and record a complete outcome. A record conflict
    /// means an identical upload won the race; convert it to Duplicate.
    fn succeed(
        &self,
        doc: &UploadedDocument,
        hash: ContentHash,
        strategy: String,
        tables: Vec<CanonicalTable>,
    ) -> Result<ExtractionOutcome> {
        let writer = ArtifactWriter::new(self.blobs);

        let mut tables = tables;
        let first = tables.remove(0);
        let artifact = match writer.write_csv(&first, ArtifactWriter::csv_location(&hash)) {
            Ok(location) => location,
            Err(error) => return self.fail(doc, hash, error),
        };

        if self.options.persist_all_tables {
            for (i, table) in tables.iter().enumerate() {
                let location = ArtifactWriter::indexed_csv_location(&hash, i + 1);
                if let Err(error) = writer.write_csv(table, location) {
                    return self.fail(doc, hash, error);
                }
            }
        }

        let record = ProcessingRecord::complete(hash.clone(), doc.filename(), artifact.clone());
        match self.records.insert(record)? {
            InsertOutcome::Inserted => {
                log::debug!("{}: extracted via '{}'", hash.short(), strategy);
                Ok(ExtractionOutcome::Success {
                    hash,
                    strategy,
                    table: first,
                    artifact,
                })
            }
            InsertOutcome::Conflict(existing) => {
                log::debug!("{}: lost record race, treating as duplicate", hash.short());
                Ok(ExtractionOutcome::Duplicate {
                    hash,
                    record: existing,
                })
            }
        }
    }

    /// Persist the diagnostic (unless the failure is the expected
    /// no-tables case) and record a failed outcome.
    fn fail(
        &self,
        doc: &UploadedDocument,
        hash: ContentHash,
        error: Error,
    ) -> Result<ExtractionOutcome> {
        let diagnostic = if matches!(error, Error::NoTablesFound) {
            None
        } else {
            log::warn!("{}: extraction failed: {}", hash.short(), error);
            let writer = ArtifactWriter::new(self.blobs);
            let detail = diagnostic_detail(doc, &hash, &error);
            Some(writer.write_error(&hash, &detail)?)
        };

        let record = ProcessingRecord::failed(hash.clone(), doc.filename(), diagnostic.clone());
        match self.records.insert(record)? {
            InsertOutcome::Inserted => Ok(ExtractionOutcome::Failed {
                hash,
                error,
                diagnostic,
            }),
            InsertOutcome::Conflict(existing) => Ok(ExtractionOutcome::Duplicate {
                hash,
                record: existing,
            }),
        }
    }
}

/// Full failure detail for the error artifact: filename, hash and the
/// complete error chain.
fn diagnostic_detail(doc: &UploadedDocument, hash: &ContentHash, error: &Error) -> String {
    use std::error::Error as _;
    use std::fmt::Write;

    let mut detail = String::new();
    let _ = writeln!(detail, "file: {}", doc.filename());
    let _ = writeln!(detail, "hash: {}", hash);
    let _ = writeln!(detail, "error: {}", error);
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = writeln!(detail, "caused by: {}", cause);
        source = cause.source();
    }
    detail
}
