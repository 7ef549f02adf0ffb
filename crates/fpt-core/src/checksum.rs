//! Content fingerprint for backup bodies.
//!
//! This is a 32-bit polynomial rolling hash (`h = h * 31 + byte`, wrapping),
//! rendered as the lowercase hex of its absolute value. It detects accidental
//! corruption and truncation of a persisted snapshot. It is NOT a
//! tamper-proofing control: collisions are cheap to construct on purpose, and
//! two different bodies can share a checksum.

/// Compute the fingerprint of a serialized snapshot body.
#[must_use]
pub fn compute_checksum(body: &[u8]) -> String {
    let hash = body.iter().fold(0_i32, |hash, &byte| {
        hash.wrapping_mul(31).wrapping_add(i32::from(byte))
    });
    format!("{:x}", hash.unsigned_abs())
}

/// Check a body against a stored fingerprint.
#[must_use]
pub fn matches(body: &[u8], expected: &str) -> bool {
    compute_checksum(body).eq_ignore_ascii_case(expected)
}
