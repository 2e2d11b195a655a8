//! Content hashing for cache keys.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 of the JSON form of `value`, as 64 lowercase hex characters.
///
/// Only deterministic serializations give stable keys; use ordered maps and
/// sets in anything hashed here.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
