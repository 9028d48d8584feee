//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a normalized request URL.
pub fn fingerprint(normalized_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_url.as_bytes());
    hex::encode(hasher.finalize())
}
