//! Key Codec Module
//!
//! Deterministic derivation of cache keys from request parameters.
//!
//! Identical `(prefix, params)` must always produce the same key, across
//! restarts and regardless of the order the parameters are supplied in, so
//! params are sorted by name before hashing. Every field goes into the
//! digest length-prefixed, which keeps a prefix from aliasing into another
//! prefix's key space through crafted concatenation.

use sha2::{Digest, Sha256};

/// Number of hex characters of the SHA-256 digest kept in the key (128 bits).
const KEY_DIGEST_LEN: usize = 32;

// == Derive Key ==
/// Derives a stable cache key from a type prefix and named parameters.
///
/// The result is `{prefix}:{digest}` where the digest covers the prefix and
/// the canonicalized parameter list.
///
/// # Arguments
/// * `prefix` - Type prefix identifying the cached operation family
/// * `params` - Named parameter values, in any order
pub fn derive_key(prefix: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    update_field(&mut hasher, prefix);
    for (name, value) in sorted {
        update_field(&mut hasher, name);
        update_field(&mut hasher, value);
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(KEY_DIGEST_LEN);
    for byte in digest.iter().take(KEY_DIGEST_LEN / 2) {
        hex.push_str(&format!("{:02x}", byte));
    }

    format!("{}:{}", prefix, hex)
}

/// Feeds one field into the digest, length-prefixed.
fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field.as_bytes());
}
