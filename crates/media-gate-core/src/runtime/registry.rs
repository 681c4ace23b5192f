// crates/media-gate-core/src/runtime/registry.rs
// ============================================================================
// Module: Media Gate Key Registry
// Description: CRUD lifecycle for API credentials.
// Purpose: Issue, inspect, mutate, and revoke credentials with strict
//          ownership enforcement.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The Key Registry owns the credential lifecycle. Creation is the only
//! point in the system where a plaintext composite credential is observable;
//! the registry returns it exactly once and persists only the secret digest.
//! Management callers arrive pre-authenticated from the external identity
//! layer; the registry enforces ownership-or-privileged-role on every
//! operation and reports errors precisely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::core::CallerIdentity;
use crate::core::Clock;
use crate::core::Credential;
use crate::core::CredentialPatch;
use crate::core::CredentialRecord;
use crate::core::KeyId;
use crate::core::OwnerId;
use crate::core::Permission;
use crate::core::RateLimitPolicy;
use crate::core::UsageStats;
use crate::core::compose_token;
use crate::core::generate_key_id;
use crate::core::generate_secret;
use crate::core::hash_secret;
use crate::interfaces::GateAuditEvent;
use crate::interfaces::GateAuditSink;
use crate::interfaces::KeyStore;
use crate::interfaces::StoreError;
use crate::runtime::retry::with_transient_retries;
use crate::runtime::store::SharedKeyStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum attempts to generate a non-colliding key id.
const MAX_KEY_ID_ATTEMPTS: u32 = 3;
/// Maximum accepted credential name length.
const MAX_NAME_LENGTH: usize = 128;
/// Maximum accepted credential description length.
const MAX_DESCRIPTION_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key Registry errors, reported precisely to management callers.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed input to a management operation.
    #[error("validation error: {0}")]
    Validation(String),
    /// No credential exists for the key id.
    #[error("credential not found")]
    NotFound,
    /// Caller is neither the owner nor privileged.
    #[error("caller is not authorized for this credential")]
    Forbidden,
    /// Backing store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request to issue a new credential.
#[derive(Debug, Clone)]
pub struct CreateKeyRequest {
    /// Principal the credential is issued to.
    pub owner_id: OwnerId,
    /// Display name; required and non-empty.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Capabilities to grant; required and non-empty.
    pub permissions: BTreeSet<Permission>,
    /// Optional ceilings replacing the configured defaults.
    pub rate_limit_override: Option<RateLimitPolicy>,
    /// Optional absolute expiry (unix ms); must be in the future.
    pub expires_at_ms: Option<i64>,
}

/// A freshly issued credential with its display-once plaintext token.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// Public view of the stored credential.
    pub credential: Credential,
    /// Composite plaintext token (`key_id "." secret`). Observable only
    /// here, only once; the registry retains no copy.
    pub plaintext_token: String,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Credential lifecycle manager backed by the Key Store.
pub struct KeyRegistry {
    /// Durable credential storage.
    keys: SharedKeyStore,
    /// Injected wall clock.
    clock: Arc<dyn Clock>,
    /// Audit sink for lifecycle events.
    audit: Arc<dyn GateAuditSink>,
    /// Default ceilings applied when a create omits an override.
    default_rate_limit: RateLimitPolicy,
    /// Issuable capability whitelist from configuration.
    allowed_permissions: BTreeSet<Permission>,
}

impl KeyRegistry {
    /// Builds a registry from explicit collaborators.
    #[must_use]
    pub fn new(
        keys: SharedKeyStore,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn GateAuditSink>,
        default_rate_limit: RateLimitPolicy,
        allowed_permissions: BTreeSet<Permission>,
    ) -> Self {
        Self {
            keys,
            clock,
            audit,
            default_rate_limit,
            allowed_permissions,
        }
    }

    /// Issues a new credential and returns the plaintext token exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for missing/empty name or
    /// permissions, permissions outside the configured whitelist, non-future
    /// expiry, or zero ceilings; [`RegistryError::Store`] on storage failure.
    pub fn create(&self, request: CreateKeyRequest) -> Result<IssuedCredential, RegistryError> {
        let now_ms = self.clock.now_ms();
        validate_name(&request.name)?;
        validate_description(request.description.as_deref())?;
        validate_permissions(&request.permissions, &self.allowed_permissions)?;
        let rate_limit = request.rate_limit_override.unwrap_or(self.default_rate_limit);
        validate_rate_limit(&rate_limit)?;
        if let Some(expires_at_ms) = request.expires_at_ms
            && expires_at_ms <= now_ms
        {
            return Err(RegistryError::Validation("expires_at must be in the future".to_string()));
        }

        let secret = generate_secret();
        let secret_hash = hash_secret(&secret);
        // Conditional create: a duplicate key id is refused by the store, and
        // a fresh id is generated for the next attempt.
        let mut attempt = 0;
        let record = loop {
            let record = CredentialRecord {
                key_id: generate_key_id(),
                secret_hash: secret_hash.clone(),
                owner_id: request.owner_id.clone(),
                name: request.name.clone(),
                description: request.description.clone(),
                permissions: request.permissions.clone(),
                rate_limit,
                is_active: true,
                expires_at_ms: request.expires_at_ms,
                created_at_ms: now_ms,
                updated_at_ms: now_ms,
                last_used_at_ms: None,
                usage_stats: UsageStats::default(),
            };
            match with_transient_retries(|| self.keys.insert(&record)) {
                Ok(()) => break record,
                Err(StoreError::Conflict(_)) if attempt < MAX_KEY_ID_ATTEMPTS => {
                    attempt += 1;
                }
                Err(error) => return Err(RegistryError::Store(error)),
            }
        };

        self.audit.record(&GateAuditEvent::registry("create", &record.key_id));
        let plaintext_token = compose_token(&record.key_id, &secret);
        Ok(IssuedCredential {
            credential: record.to_credential(),
            plaintext_token,
        })
    }

    /// Returns the credential for the key id, without secret material.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when absent,
    /// [`RegistryError::Forbidden`] when the caller is neither owner nor
    /// privileged, or [`RegistryError::Store`] on storage failure.
    pub fn get(&self, key_id: &KeyId, caller: &CallerIdentity) -> Result<Credential, RegistryError> {
        let record = self.load(key_id)?;
        if !caller.may_manage(&record.owner_id) {
            return Err(RegistryError::Forbidden);
        }
        Ok(record.to_credential())
    }

    /// Lists credentials for the target owner, filtering inactive entries
    /// unless requested.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Forbidden`] when the caller may not manage
    /// the target owner's credentials, or [`RegistryError::Store`] on
    /// storage failure.
    pub fn list(
        &self,
        owner_id: &OwnerId,
        caller: &CallerIdentity,
        include_inactive: bool,
    ) -> Result<Vec<Credential>, RegistryError> {
        if !caller.may_manage(owner_id) {
            return Err(RegistryError::Forbidden);
        }
        let records = with_transient_retries(|| self.keys.list_by_owner(owner_id))?;
        Ok(records
            .iter()
            .filter(|record| include_inactive || record.is_active)
            .map(CredentialRecord::to_credential)
            .collect())
    }

    /// Applies a patch to the mutable credential fields.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the patch contains zero
    /// recognized mutable fields or fails field validation;
    /// [`RegistryError::NotFound`] / [`RegistryError::Forbidden`] /
    /// [`RegistryError::Store`] as for [`Self::get`].
    pub fn update(
        &self,
        key_id: &KeyId,
        caller: &CallerIdentity,
        patch: &CredentialPatch,
    ) -> Result<Credential, RegistryError> {
        if patch.is_empty() {
            return Err(RegistryError::Validation(
                "patch contains no recognized mutable field".to_string(),
            ));
        }
        let mut record = self.load(key_id)?;
        if !caller.may_manage(&record.owner_id) {
            return Err(RegistryError::Forbidden);
        }
        if let Some(name) = &patch.name {
            validate_name(name)?;
            record.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            validate_description(Some(description))?;
            record.description =
                if description.is_empty() { None } else { Some(description.clone()) };
        }
        if let Some(permissions) = &patch.permissions {
            validate_permissions(permissions, &self.allowed_permissions)?;
            record.permissions.clone_from(permissions);
        }
        if let Some(rate_limit) = patch.rate_limit {
            validate_rate_limit(&rate_limit)?;
            record.rate_limit = rate_limit;
        }
        if let Some(is_active) = patch.is_active {
            record.is_active = is_active;
        }
        record.updated_at_ms = self.clock.now_ms();
        with_transient_retries(|| self.keys.update(&record))?;
        self.audit.record(&GateAuditEvent::registry("update", key_id));
        Ok(record.to_credential())
    }

    /// Deletes the credential. Subsequent validations fail immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] / [`RegistryError::Forbidden`] /
    /// [`RegistryError::Store`] as for [`Self::get`].
    pub fn delete(&self, key_id: &KeyId, caller: &CallerIdentity) -> Result<(), RegistryError> {
        let record = self.load(key_id)?;
        if !caller.may_manage(&record.owner_id) {
            return Err(RegistryError::Forbidden);
        }
        let removed = with_transient_retries(|| self.keys.delete(key_id))?;
        if !removed {
            return Err(RegistryError::NotFound);
        }
        self.audit.record(&GateAuditEvent::registry("delete", key_id));
        Ok(())
    }

    /// Loads a record or reports `NotFound`.
    fn load(&self, key_id: &KeyId) -> Result<CredentialRecord, RegistryError> {
        with_transient_retries(|| self.keys.get(key_id))?.ok_or(RegistryError::NotFound)
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates a credential display name.
fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::Validation("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(RegistryError::Validation(format!(
            "name exceeds {MAX_NAME_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Validates an optional credential description.
fn validate_description(description: Option<&str>) -> Result<(), RegistryError> {
    if let Some(description) = description
        && description.len() > MAX_DESCRIPTION_LENGTH
    {
        return Err(RegistryError::Validation(format!(
            "description exceeds {MAX_DESCRIPTION_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Validates that the requested permissions are non-empty and within the
/// configured whitelist.
fn validate_permissions(
    requested: &BTreeSet<Permission>,
    allowed: &BTreeSet<Permission>,
) -> Result<(), RegistryError> {
    if requested.is_empty() {
        return Err(RegistryError::Validation("permissions must not be empty".to_string()));
    }
    for permission in requested {
        if !allowed.contains(permission) {
            return Err(RegistryError::Validation(format!(
                "permission not in whitelist: {permission}"
            )));
        }
    }
    Ok(())
}

/// Validates that every ceiling is at least one.
fn validate_rate_limit(rate_limit: &RateLimitPolicy) -> Result<(), RegistryError> {
    if rate_limit.per_minute == 0 || rate_limit.per_hour == 0 || rate_limit.per_day == 0 {
        return Err(RegistryError::Validation(
            "rate limit ceilings must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
