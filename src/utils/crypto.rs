// src/utils/crypto.rs
//! Hashing utilities.
//!
//! Uses SHA-256 (via `ring`), the digest certificates commit to in `hashDoc`.

use ring::digest::{digest, SHA256};

/// Computes the SHA-256 of `data` as lowercase hex.
///
/// The result always satisfies the `hashDoc` format check.
///
/// # Example
/// ```
/// use cert_registry::utils::crypto::digest_document;
/// assert_eq!(
///     digest_document(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn digest_document(data: &[u8]) -> String {
    hex::encode(digest(&SHA256, data))
}
