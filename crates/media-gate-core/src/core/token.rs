// crates/media-gate-core/src/core/token.rs
// ============================================================================
// Module: Media Gate Token Material
// Description: Secret generation and composite credential token handling.
// Purpose: Keep all plaintext-secret handling in one auditable module.
// Dependencies: base64, rand, subtle
// ============================================================================

//! ## Overview
//! A presented credential is a single opaque string `key_id "." secret`.
//! The key-id alphabet (URL-safe base64 plus a fixed prefix) never contains
//! the dot separator, so the first dot splits the token unambiguously.
//! Secrets are 256 bits of OS entropy; only their digest persists.
//!
//! Security posture: this module is the only place plaintext secrets are
//! generated, and comparisons against stored digests are constant time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::KeyId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Stable prefix for generated key identifiers.
pub const KEY_ID_PREFIX: &str = "mgk_";
/// Random bytes in a generated key-id suffix (120 bits).
const KEY_ID_SUFFIX_BYTES: usize = 15;
/// Random bytes in a generated secret (256 bits).
const SECRET_BYTES: usize = 32;
/// Separator between key id and secret in the composite token.
pub const TOKEN_SEPARATOR: char = '.';
/// Maximum accepted token length; longer inputs are rejected before parsing.
pub const MAX_TOKEN_BYTES: usize = 512;

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Generates a fresh key identifier with the stable prefix and a random
/// URL-safe suffix.
#[must_use]
pub fn generate_key_id() -> KeyId {
    let mut bytes = [0u8; KEY_ID_SUFFIX_BYTES];
    OsRng.fill_bytes(&mut bytes);
    KeyId::new(format!("{KEY_ID_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes)))
}

/// Generates a fresh 256-bit secret encoded as URL-safe base64.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hashes a plaintext secret for storage or comparison.
#[must_use]
pub fn hash_secret(secret: &str) -> HashDigest {
    hash_bytes(DEFAULT_HASH_ALGORITHM, secret.as_bytes())
}

/// Composes the caller-visible token from a key id and plaintext secret.
///
/// This is the only point where the plaintext composite credential exists;
/// callers must treat the result as display-once material.
#[must_use]
pub fn compose_token(key_id: &KeyId, secret: &str) -> String {
    format!("{}{TOKEN_SEPARATOR}{secret}", key_id.as_str())
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parsed form of a presented credential token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedToken {
    /// Key identifier portion.
    pub key_id: KeyId,
    /// Plaintext secret portion.
    pub secret: String,
}

/// Parses `key_id "." secret`, rejecting oversized, non-ASCII, or
/// structurally malformed input.
///
/// Returns `None` when the separator is absent or either part is empty.
#[must_use]
pub fn parse_token(token: &str) -> Option<PresentedToken> {
    if token.len() > MAX_TOKEN_BYTES || !token.is_ascii() {
        return None;
    }
    let (key_id, secret) = token.split_once(TOKEN_SEPARATOR)?;
    if key_id.is_empty() || secret.is_empty() {
        return None;
    }
    Some(PresentedToken {
        key_id: KeyId::new(key_id),
        secret: secret.to_string(),
    })
}

// ============================================================================
// SECTION: Constant-Time Comparison
// ============================================================================

/// Compares two byte slices in constant time.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compares a presented secret against a stored digest in constant time.
///
/// The presented secret is hashed first, so the comparison length is fixed
/// regardless of attacker-controlled input length.
#[must_use]
pub fn secret_matches(presented_secret: &str, stored_hash: &HashDigest) -> bool {
    let presented = hash_bytes(stored_hash.algorithm, presented_secret.as_bytes());
    constant_time_eq(presented.value.as_bytes(), stored_hash.value.as_bytes())
}
