//! SHA-256 digests used for stable identifiers
//!
//! Source IDs and workspace cache directories are both derived from hashes of
//! canonical strings, so they stay stable across sessions and renames.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `content`.
pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The first `len` hex characters of the SHA-256 of `content`.
pub fn short_digest(content: &str, len: usize) -> String {
    let mut hex = sha256_hex(content);
    hex.truncate(len);
    hex
}
