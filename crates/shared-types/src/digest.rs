//! Content digests used for block hashes, merkle leaves and duplicate
//! suppression.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Uppercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

/// Digest of the canonical JSON form of `value`.
///
/// Struct fields serialize in declaration order and `serde_json` maps are
/// sorted, so equal documents always produce equal digests.
#[must_use]
pub fn document_digest<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_vec(value) {
        Ok(bytes) => sha256_hex(&bytes),
        // Serializing plain data structs cannot fail; keep a stable fallback.
        Err(_) => sha256_hex(&[]),
    }
}
