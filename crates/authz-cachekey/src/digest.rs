//! SHA-256 helpers shared by the identity and matcher fingerprints
//!
//! Digests are always rendered as lowercase hex (64 characters).

use sha2::{Digest, Sha256};

/// Length of a SHA-256 digest rendered as hex
pub const SHA256_HEX_LEN: usize = 64;

/// Compute SHA-256 over the concatenation of `parts`, returned as lowercase hex
///
/// Parts are fed to the hasher back to back with no separator, so
/// `["ab", "c"]` and `["a", "bc"]` produce the same digest. Existing cache
/// keys depend on this, so callers must not rely on part boundaries.
pub fn sha256_hex_concat<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
    }
    let out = hasher.finalize();
    base16ct::lower::encode_string(&out)
}
