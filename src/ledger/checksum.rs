//! Content checksums recorded in the ledger.
//!
//! Checksums are SHA-256 over the exact bytes written to disk, formatted as
//! `sha256:<lowercase hex>`. Any byte-level change, whitespace included,
//! produces a different checksum.

use sha2::{Digest, Sha256};

/// Compute the ledger checksum of `content`.
///
/// ```rust
/// use kitpm_cli::ledger::checksum::compute_checksum;
///
/// let checksum = compute_checksum(b"");
/// assert_eq!(
///     checksum,
///     "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Whether `content` hashes to `expected`.
#[must_use]
pub fn verify_checksum(content: &[u8], expected: &str) -> bool {
    compute_checksum(content) == expected
}
