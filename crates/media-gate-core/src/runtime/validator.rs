// crates/media-gate-core/src/runtime/validator.rs
// ============================================================================
// Module: Media Gate Credential Validator
// Description: Ordered verification of presented credential tokens.
// Purpose: Resolve a presented token to a credential or a diagnostic failure.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Validation runs a fixed check order: parse, lookup, active, expiry,
//! constant-time secret compare, required-permission subset. Each failure
//! kind is preserved for audit logging but callers at the boundary flatten
//! all of them to a single unauthorized outcome so probing reveals nothing
//! about which check failed.
//!
//! Security posture: fail closed; the secret digest comparison is constant
//! time and no positive validation result is ever cached across requests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Credential;
use crate::core::KeyId;
use crate::core::Permission;
use crate::core::parse_token;
use crate::core::secret_matches;
use crate::interfaces::KeyStore;
use crate::interfaces::StoreError;
use crate::runtime::retry::with_transient_retries;
use crate::runtime::store::SharedKeyStore;

// ============================================================================
// SECTION: Failure Kinds
// ============================================================================

/// Diagnostic validation failure kinds.
///
/// # Invariants
/// - Kinds exist for logging and metrics only; the gateway surfaces every
///   kind as one uniform unauthorized outcome.
#[derive(Debug, Error)]
pub enum ValidationFailure {
    /// The token lacked the separator or had an empty part.
    #[error("malformed credential token")]
    Malformed,
    /// No credential exists for the parsed key id.
    #[error("unknown key id")]
    UnknownKey,
    /// The credential is deactivated.
    #[error("credential inactive")]
    Inactive,
    /// The credential expiry has passed.
    #[error("credential expired")]
    Expired,
    /// The presented secret digest did not match the stored digest.
    #[error("secret mismatch")]
    SecretMismatch,
    /// A required permission is missing from the credential.
    #[error("missing permission: {0}")]
    MissingPermission(Permission),
    /// The key store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ValidationFailure {
    /// Returns the stable label used in audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::UnknownKey => "unknown_key",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::SecretMismatch => "secret_mismatch",
            Self::MissingPermission(_) => "missing_permission",
            Self::Store(_) => "store",
        }
    }

    /// Returns true when the failure came from the key store rather than a
    /// logical check.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Failed validation outcome carrying the diagnostic kind and, when the
/// credential was resolved, the key id the failure is attributable to.
#[derive(Debug)]
pub struct FailedValidation {
    /// Diagnostic failure kind.
    pub kind: ValidationFailure,
    /// Resolved key id; `None` for malformed tokens, unknown keys, and
    /// lookup failures, which have no credential to charge.
    pub key_id: Option<KeyId>,
}

impl FailedValidation {
    /// Builds a failure with no attributable credential.
    const fn unattributed(kind: ValidationFailure) -> Self {
        Self {
            kind,
            key_id: None,
        }
    }

    /// Builds a failure attributable to a resolved credential.
    const fn attributed(kind: ValidationFailure, key_id: KeyId) -> Self {
        Self {
            kind,
            key_id: Some(key_id),
        }
    }
}

// ============================================================================
// SECTION: Validated Credential
// ============================================================================

/// Successful validation outcome.
#[derive(Debug, Clone)]
pub struct ValidatedCredential {
    /// The credential, without secret material.
    pub credential: Credential,
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Credential validator backed by the Key Store.
pub struct CredentialValidator {
    /// Durable credential storage.
    keys: SharedKeyStore,
}

impl CredentialValidator {
    /// Builds a validator over the shared key store.
    #[must_use]
    pub const fn new(keys: SharedKeyStore) -> Self {
        Self {
            keys,
        }
    }

    /// Validates a presented token against the store and the endpoint's
    /// required permissions, at the provided time.
    ///
    /// # Errors
    ///
    /// Returns a [`FailedValidation`] describing the first check that
    /// failed, in the fixed order: parse, lookup, active, expiry, secret,
    /// permissions.
    pub fn validate(
        &self,
        token: &str,
        required_permissions: &[Permission],
        now_ms: i64,
    ) -> Result<ValidatedCredential, FailedValidation> {
        let presented = parse_token(token)
            .ok_or(FailedValidation::unattributed(ValidationFailure::Malformed))?;
        let record = with_transient_retries(|| self.keys.get(&presented.key_id))
            .map_err(|error| FailedValidation::unattributed(ValidationFailure::Store(error)))?
            .ok_or(FailedValidation::unattributed(ValidationFailure::UnknownKey))?;
        let key_id = record.key_id.clone();
        if !record.is_active {
            return Err(FailedValidation::attributed(ValidationFailure::Inactive, key_id));
        }
        if record.is_expired(now_ms) {
            return Err(FailedValidation::attributed(ValidationFailure::Expired, key_id));
        }
        if !secret_matches(&presented.secret, &record.secret_hash) {
            return Err(FailedValidation::attributed(ValidationFailure::SecretMismatch, key_id));
        }
        for permission in required_permissions {
            if !record.permissions.contains(permission) {
                return Err(FailedValidation::attributed(
                    ValidationFailure::MissingPermission(*permission),
                    key_id,
                ));
            }
        }
        Ok(ValidatedCredential {
            credential: record.to_credential(),
        })
    }
}
