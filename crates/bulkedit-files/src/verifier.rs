//! Content verification and integrity checking

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::FileError;

/// Verifies content integrity through SHA-256 hashing
#[derive(Debug, Clone, Default)]
pub struct ContentVerifier;

impl ContentVerifier {
    /// Creates a new ContentVerifier instance
    pub fn new() -> Self {
        ContentVerifier
    }

    /// Computes SHA-256 hash of content
    ///
    /// # Arguments
    ///
    /// * `content` - The content to hash
    ///
    /// # Returns
    ///
    /// Hexadecimal string representation of the SHA-256 hash
    pub fn compute_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Stable blob name for a captured file, derived from its path
    pub fn blob_name(path: &Path) -> String {
        format!("{}.bak", Self::compute_hash(&path.to_string_lossy()))
    }

    /// Verifies that `content` still hashes to `stored_hash`
    ///
    /// # Arguments
    ///
    /// * `path` - File the content belongs to, used in the error
    /// * `content` - Content read back from storage
    /// * `stored_hash` - Hash recorded at capture time
    pub fn verify_content(
        &self,
        path: &Path,
        content: &str,
        stored_hash: &str,
    ) -> Result<(), FileError> {
        if Self::compute_hash(content) == stored_hash {
            Ok(())
        } else {
            Err(FileError::BackupCorrupted(path.to_path_buf()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_content_sensitive() {
        let first = ContentVerifier::compute_hash("fn main() {}\n");
        assert_eq!(first, ContentVerifier::compute_hash("fn main() {}\n"));
        assert_ne!(first, ContentVerifier::compute_hash("fn main() {}\r\n"));
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_empty_content_has_the_well_known_digest() {
        assert_eq!(
            ContentVerifier::compute_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_blob_name_differs_per_path() {
        let a = ContentVerifier::blob_name(Path::new("/w/a.txt"));
        let b = ContentVerifier::blob_name(Path::new("/w/b.txt"));
        assert_ne!(a, b);
        assert!(a.ends_with(".bak"));
    }

    #[test]
    fn test_verify_content_detects_corruption() {
        let verifier = ContentVerifier::new();
        let path = Path::new("a.txt");
        let hash = ContentVerifier::compute_hash("original");

        assert!(verifier.verify_content(path, "original", &hash).is_ok());
        match verifier.verify_content(path, "tampered", &hash) {
            Err(FileError::BackupCorrupted(p)) => assert_eq!(p, path),
            other => panic!("Expected BackupCorrupted error, got {:?}", other),
        }
    }
}
