//! Artifact and record storage.
//!
//! Two seams keep the pipeline testable: [`BlobStore`] holds artifact
//! bytes (CSV output, error diagnostics) and [`RecordStore`] holds the
//! per-hash processing records used for deduplication. The filesystem
//! implementations back production use; the in-memory ones back tests.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::model::{ArtifactLocation, CanonicalTable, ProcessingRecord};

/// Stores artifact bytes at content-derived locations.
///
/// Writes are idempotent at this layer: the same location may be written
/// again and later bytes win. The pipeline only writes a location once
/// per unique hash, so overwrites do not occur in practice.
pub trait BlobStore: Send + Sync {
    fn put(&self, location: &ArtifactLocation, bytes: &[u8]) -> Result<()>;
    fn get(&self, location: &ArtifactLocation) -> Result<Vec<u8>>;
}

/// Filesystem blob store rooted at a directory.
///
/// Writes go through a temp file in the target directory and a rename,
/// so readers never observe a half-written artifact.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, location: &ArtifactLocation) -> PathBuf {
        self.root.join(location.as_str())
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, location: &ArtifactLocation, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(location);
        let dir = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| Error::Storage(format!("create {}: {}", dir.display(), e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::Storage(format!("temp file in {}: {}", dir.display(), e)))?;
        tmp.write_all(bytes)
            .map_err(|e| Error::Storage(format!("write {}: {}", path.display(), e)))?;
        tmp.persist(&path)
            .map_err(|e| Error::Storage(format!("persist {}: {}", path.display(), e)))?;

        log::debug!("stored {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn get(&self, location: &ArtifactLocation) -> Result<Vec<u8>> {
        let path = self.resolve(location);
        fs::read(&path).map_err(|e| Error::Storage(format!("read {}: {}", path.display(), e)))
    }
}

/// In-memory blob store for tests. Counts writes per location so tests
/// can assert that deduplication skipped the write path.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, (Vec<u8>, usize)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `location` has been written.
    pub fn write_count(&self, location: &ArtifactLocation) -> usize {
        self.blobs
            .lock()
            .map(|b| b.get(location.as_str()).map_or(0, |(_, n)| *n))
            .unwrap_or(0)
    }

    /// Total writes across all locations.
    pub fn total_writes(&self) -> usize {
        self.blobs
            .lock()
            .map(|b| b.values().map(|(_, n)| n).sum())
            .unwrap_or(0)
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, location: &ArtifactLocation, bytes: &[u8]) -> Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| Error::Storage("blob store lock poisoned".into()))?;
        let entry = blobs
            .entry(location.as_str().to_string())
            .or_insert_with(|| (Vec::new(), 0));
        entry.0 = bytes.to_vec();
        entry.1 += 1;
        Ok(())
    }

    fn get(&self, location: &ArtifactLocation) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| Error::Storage("blob store lock poisoned".into()))?;
        blobs
            .get(location.as_str())
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| Error::Storage(format!("no blob at {}", location)))
    }
}

/// Outcome of inserting a processing record.
#[derive(Debug)]
pub enum InsertOutcome {
    /// Record stored, hash was new.
    Inserted,
    /// Hash already recorded: the existing record, untouched.
    Conflict(ProcessingRecord),
}

/// Stores processing records keyed by content hash.
///
/// The uniqueness guarantee lives here: `insert` must reject a second
/// record for the same hash and hand back the existing one, so the
/// pipeline can turn a lost race into a duplicate outcome.
pub trait RecordStore: Send + Sync {
    fn find(&self, hash: &ContentHash) -> Result<Option<ProcessingRecord>>;
    fn insert(&self, record: ProcessingRecord) -> Result<InsertOutcome>;
}

/// In-memory record store with a first-writer-wins uniqueness rule.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, ProcessingRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records, in no particular order.
    pub fn all(&self) -> Vec<ProcessingRecord> {
        self.records
            .lock()
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn find(&self, hash: &ContentHash) -> Result<Option<ProcessingRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| Error::Storage("record store lock poisoned".into()))?;
        Ok(records.get(hash.as_str()).cloned())
    }

    fn insert(&self, record: ProcessingRecord) -> Result<InsertOutcome> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::Storage("record store lock poisoned".into()))?;
        match records.get(record.hash.as_str()) {
            Some(existing) => Ok(InsertOutcome::Conflict(existing.clone())),
            None => {
                records.insert(record.hash.as_str().to_string(), record);
                Ok(InsertOutcome::Inserted)
            }
        }
    }
}

/// Writes extraction artifacts through a blob store.
pub struct ArtifactWriter<'a> {
    store: &'a dyn BlobStore,
}

impl<'a> ArtifactWriter<'a> {
    pub fn new(store: &'a dyn BlobStore) -> Self {
        Self { store }
    }

    /// Location of the primary CSV artifact for a hash.
    pub fn csv_location(hash: &ContentHash) -> ArtifactLocation {
        ArtifactLocation::new(format!("csv/{}.csv", hash))
    }

    /// Location of a secondary CSV artifact (tables beyond the first).
    pub fn indexed_csv_location(hash: &ContentHash, index: usize) -> ArtifactLocation {
        ArtifactLocation::new(format!("csv/{}_{}.csv", hash, index))
    }

    /// Location of the error diagnostic artifact for a hash.
    pub fn error_location(hash: &ContentHash) -> ArtifactLocation {
        ArtifactLocation::new(format!("errors/{}.txt", hash))
    }

    /// Serialize a canonical table as CSV and store it under the hash.
    pub fn write_csv(
        &self,
        table: &CanonicalTable,
        location: ArtifactLocation,
    ) -> Result<ArtifactLocation> {
        let csv = encode_csv(table);
        self.store.put(&location, csv.as_bytes())?;
        Ok(location)
    }

    /// Store a full failure diagnostic under the hash.
    pub fn write_error(&self, hash: &ContentHash, detail: &str) -> Result<ArtifactLocation> {
        let location = Self::error_location(hash);
        self.store.put(&location, detail.as_bytes())?;
        Ok(location)
    }
}

/// Encode a canonical table as CSV text, header row first.
///
/// Cells containing the delimiter, a quote or a line break are quoted,
/// with embedded quotes doubled. Rows end with `\n`.
pub fn encode_csv(table: &CanonicalTable) -> String {
    let mut out = String::new();
    encode_row(&mut out, &table.header);
    for row in &table.rows {
        encode_row(&mut out, row);
    }
    out
}

fn encode_row(out: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        encode_cell(out, cell);
    }
    out.push('\n');
}

fn encode_cell(out: &mut String, cell: &str) {
    if cell.contains(['"', ',', '\n', '\r']) {
        out.push('"');
        for ch in cell.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    } else {
        out.push_str(cell);
    }
}
