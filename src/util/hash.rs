//! Hashing utilities for artifact checksums.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::core::StowError;

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check a file against an expected SHA256 digest.
///
/// Fails with [`StowError::ChecksumMismatch`] on disagreement.
pub fn verify_sha256_file(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(path)?;
    check_digest(&path.display().to_string(), expected, actual)
}

/// Check bytes against an expected SHA256 digest.
pub fn verify_sha256_bytes(what: &str, data: &[u8], expected: &str) -> Result<()> {
    check_digest(what, expected, sha256_bytes(data))
}

fn check_digest(what: &str, expected: &str, actual: String) -> Result<()> {
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(StowError::ChecksumMismatch {
            artifact: what.to_string(),
            expected: expected.trim().to_string(),
            actual,
        }
        .into());
    }

    tracing::debug!("sha256 verified for {}: {}", what, &actual[..16]);
    Ok(())
}
