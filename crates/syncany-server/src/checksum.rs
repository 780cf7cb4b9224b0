//! SHA-256 content digests.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{ChecksumMismatchError, ConfigError};

/// Read buffer size for hashing.
const HASH_CHUNK_BYTES: usize = 64 * 1024;

/// Lowercase hex SHA-256 of a file's full content.
pub fn checksum_of(path: &Path) -> Result<String, ConfigError> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConfigError::MissingFile(path.to_path_buf()),
        _ => ConfigError::io("open for checksum", path, e),
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ConfigError::io("read for checksum", path, e)),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare a computed digest with the digest claimed by the client.
///
/// Hex case is ignored: a client sending upper-case hex for the right content
/// is accepted.
pub fn verify(computed: &str, claimed: &str) -> Result<(), ChecksumMismatchError> {
    if computed.eq_ignore_ascii_case(claimed) {
        Ok(())
    } else {
        Err(ChecksumMismatchError {
            expected: claimed.to_string(),
            actual: computed.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_empty_file_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        assert_eq!(checksum_of(&path).unwrap(), EMPTY_SHA256);
    }

    #[test]
    fn test_digest_spans_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big");
        let content = vec![7u8; HASH_CHUNK_BYTES * 2 + 13];
        fs::write(&path, &content).unwrap();

        assert_eq!(checksum_of(&path).unwrap(), hex::encode(Sha256::digest(&content)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = checksum_of(&dir.path().join("absent"));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_verify_ignores_case() {
        assert!(verify(EMPTY_SHA256, &EMPTY_SHA256.to_uppercase()).is_ok());

        let err = verify(EMPTY_SHA256, &"0".repeat(64)).unwrap_err();
        assert_eq!(err.actual, EMPTY_SHA256);
        assert_eq!(err.expected, "0".repeat(64));
    }
}
