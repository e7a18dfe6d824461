use crate::error::{IoContext, Result};
use memmap2::MmapOptions;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

/// Default size at which file hashing switches from a plain read to mmap.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 1_048_576;

/// Length of a hex-encoded digest.
pub const DIGEST_LEN: usize = 64;

/// Computes the SHA-256 digest of raw bytes as lowercase hex.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Hashes a file's full content.
///
/// Files smaller than `mmap_threshold` are read into memory, larger files
/// are memory-mapped.
///
/// # Errors
///
/// Returns [`crate::FmError::IoFailure`] if the file cannot be opened or read.
pub fn hash_file(path: &Path, mmap_threshold: u64) -> Result<String> {
    let file = File::open(path).at_path(path)?;
    let len = file.metadata().at_path(path)?.len();

    if len == 0 {
        return Ok(hash_bytes(b""));
    }

    if len < mmap_threshold {
        let content = std::fs::read(path).at_path(path)?;
        Ok(hash_bytes(&content))
    } else {
        // SAFETY: the mapping is read-only and dropped before returning; a
        // concurrent writer can only make the digest stale, which the next
        // commit observes.
        let mmap = unsafe { MmapOptions::new().map(&file) }.at_path(path)?;
        Ok(hash_bytes(&mmap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_hash_bytes() {
        let data = b"Hello, World!";
        let hash1 = hash_bytes(data);
        let hash2 = hash_bytes(data);
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), DIGEST_LEN);

        let hash3 = hash_bytes(b"Different data");
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_hash_bytes_known_vectors() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_file_matches_bytes() -> Result<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        std::fs::write(&file_path, "Test content for hashing").unwrap();

        let hash = hash_file(&file_path, DEFAULT_MMAP_THRESHOLD)?;
        assert_eq!(hash, hash_bytes(b"Test content for hashing"));
        Ok(())
    }

    #[test]
    fn test_mmap_and_read_paths_agree() -> Result<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("big.bin");
        std::fs::write(&file_path, vec![7u8; 4096]).unwrap();

        let read = hash_file(&file_path, u64::MAX)?;
        let mapped = hash_file(&file_path, 1)?;
        assert_eq!(read, mapped);
        assert_eq!(read, hash_bytes(&[7u8; 4096]));
        Ok(())
    }

    #[test]
    fn test_empty_file_hash() -> Result<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("empty");
        std::fs::write(&file_path, b"").unwrap();

        assert_eq!(hash_file(&file_path, 1)?, hash_bytes(b""));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        let dir = tempdir().unwrap();
        let err = hash_file(&dir.path().join("gone"), DEFAULT_MMAP_THRESHOLD).unwrap_err();
        assert!(matches!(err, crate::FmError::IoFailure { .. }));
    }
}
