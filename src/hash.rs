//! Content hashing for uploaded documents.
//!
//! The hash is the global dedup key: identical bytes always produce the
//! same digest, regardless of filename or upload time. It also names the
//! derived artifacts (`csv/{hash}.csv`, `errors/{hash}.txt`).

use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Chunk size used when streaming input through the hasher.
///
/// Correctness does not depend on this value; it only bounds the memory
/// used per read.
const HASH_CHUNK_SIZE: usize = 8 * 1024;

/// A stable content fingerprint: the lowercase hex SHA-256 digest of the
/// full byte content of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash an in-memory byte slice.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hash a reader, streaming in fixed-size chunks.
    pub fn of_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; HASH_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// The hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened digest prefix for log output.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = ContentHash::of_bytes(b"hello world");
        let b = ContentHash::of_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_length_and_charset() {
        let hash = ContentHash::of_bytes(b"anything");
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_differs_for_different_content() {
        let a = ContentHash::of_bytes(b"content one");
        let b = ContentHash::of_bytes(b"content two");
        assert_ne!(a, b);
    }

    #[test]
    fn test_reader_matches_bytes() {
        // Exercise multiple chunks: 3x the chunk size plus a remainder.
        let data: Vec<u8> = (0..HASH_CHUNK_SIZE * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        let from_bytes = ContentHash::of_bytes(&data);
        let from_reader = ContentHash::of_reader(&data[..]).unwrap();
        assert_eq!(from_bytes, from_reader);
    }

    #[test]
    fn test_known_digest() {
        // SHA-256 of the empty input.
        let hash = ContentHash::of_bytes(b"");
        assert_eq!(
            hash.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_short_prefix() {
        let hash = ContentHash::of_bytes(b"x");
        assert_eq!(hash.short().len(), 8);
        assert!(hash.as_str().starts_with(hash.short()));
    }
}
