//! Streamed SHA-256 hashing for local files.
//!
//! Files are read in fixed-size chunks so arbitrarily large uploads never
//! load the whole content into memory. The resulting digest is stored in
//! the metadata index and embedded in the remote caption as a
//! user-facing integrity reference.

use crate::core::config::STREAM_CHUNK_SIZE;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Compute the lowercase-hex SHA-256 digest of a file's content.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; STREAM_CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the lowercase-hex SHA-256 digest of an in-memory buffer.
/// Test-only: the application always streams from disk.
#[cfg(test)]
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_digest_matches_buffer_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        // Larger than one read chunk so the streaming loop iterates.
        let data: Vec<u8> = (0..STREAM_CHUNK_SIZE * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        File::create(&path).unwrap().write_all(&data).unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_bytes(&data));
    }

    #[test]
    fn empty_file_hashes_to_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        File::create(&path).unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn identical_content_yields_identical_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("first.txt");
        let b = dir.path().join("second.txt");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        let ha = sha256_file(&a).unwrap();
        assert_eq!(ha, sha256_file(&b).unwrap());
        assert_eq!(ha.len(), 64);
        assert!(ha.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(sha256_file(Path::new("/nonexistent/for/sure")).is_err());
    }
}
