// crates/media-gate-core/src/core/credential.rs
// ============================================================================
// Module: Media Gate Credential Model
// Description: Persistent credential records, policies, and caller identity.
// Purpose: Define the stored shape and the hash-free public view.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! [`CredentialRecord`] is the stored shape and carries the secret digest.
//! [`Credential`] is the public view returned by management operations and
//! the gateway; it never contains the digest. The plaintext secret exists
//! only inside `KeyRegistry::create` and is returned exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::OwnerId;
use crate::core::permissions::Permission;
use crate::core::time::Granularity;

// ============================================================================
// SECTION: Rate Limit Policy
// ============================================================================

/// Per-credential request ceilings for the three fixed windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum admitted requests per minute window.
    pub per_minute: u32,
    /// Maximum admitted requests per hour window.
    pub per_hour: u32,
    /// Maximum admitted requests per day window.
    pub per_day: u32,
}

impl RateLimitPolicy {
    /// Returns the ceiling for the provided granularity.
    #[must_use]
    pub const fn ceiling(&self, granularity: Granularity) -> u32 {
        match granularity {
            Granularity::Minute => self.per_minute,
            Granularity::Hour => self.per_hour,
            Granularity::Day => self.per_day,
        }
    }
}

// ============================================================================
// SECTION: Usage Stats
// ============================================================================

/// Advisory lifetime usage counters for a credential.
///
/// # Invariants
/// - Counters are monotonically non-decreasing.
/// - Eventual consistency is acceptable; quota correctness never depends on
///   these values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Total requests observed for the credential.
    pub total_requests: u64,
    /// Requests that were validated and admitted.
    pub successful_requests: u64,
    /// Requests that failed validation or were rate limited.
    pub failed_requests: u64,
    /// Time of the most recent recorded request (unix ms).
    pub last_request_at_ms: Option<i64>,
}

// ============================================================================
// SECTION: Credential Record
// ============================================================================

/// Stored credential record, including the secret digest.
///
/// # Invariants
/// - `key_id`, `secret_hash`, `owner_id`, `created_at_ms`, and `expires_at_ms`
///   are immutable after creation.
/// - Only the digest of the secret is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Caller-visible credential identifier.
    pub key_id: KeyId,
    /// One-way digest of the 256-bit secret.
    pub secret_hash: HashDigest,
    /// Identifier of the issuing principal.
    pub owner_id: OwnerId,
    /// Caller-supplied display name.
    pub name: String,
    /// Caller-supplied description.
    pub description: Option<String>,
    /// Capabilities granted to the credential.
    pub permissions: BTreeSet<Permission>,
    /// Request ceilings for the three fixed windows.
    pub rate_limit: RateLimitPolicy,
    /// Whether the credential is currently usable, independent of expiry.
    pub is_active: bool,
    /// Optional absolute expiry (unix ms); immutable once set.
    pub expires_at_ms: Option<i64>,
    /// Creation time (unix ms).
    pub created_at_ms: i64,
    /// Last mutation time (unix ms).
    pub updated_at_ms: i64,
    /// Last validation time (unix ms).
    pub last_used_at_ms: Option<i64>,
    /// Advisory lifetime usage counters.
    pub usage_stats: UsageStats,
}

impl CredentialRecord {
    /// Returns true when the credential has an expiry at or before `now_ms`.
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_some_and(|expires_at| expires_at <= now_ms)
    }

    /// Returns the public view of the record, without the secret digest.
    #[must_use]
    pub fn to_credential(&self) -> Credential {
        Credential {
            key_id: self.key_id.clone(),
            owner_id: self.owner_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            permissions: self.permissions.clone(),
            rate_limit: self.rate_limit,
            is_active: self.is_active,
            expires_at_ms: self.expires_at_ms,
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms,
            last_used_at_ms: self.last_used_at_ms,
            usage_stats: self.usage_stats,
        }
    }
}

// ============================================================================
// SECTION: Credential View
// ============================================================================

/// Public credential view returned by management operations and the gateway.
///
/// # Invariants
/// - Never carries the secret digest or any plaintext secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Caller-visible credential identifier.
    pub key_id: KeyId,
    /// Identifier of the issuing principal.
    pub owner_id: OwnerId,
    /// Caller-supplied display name.
    pub name: String,
    /// Caller-supplied description.
    pub description: Option<String>,
    /// Capabilities granted to the credential.
    pub permissions: BTreeSet<Permission>,
    /// Request ceilings for the three fixed windows.
    pub rate_limit: RateLimitPolicy,
    /// Whether the credential is currently usable, independent of expiry.
    pub is_active: bool,
    /// Optional absolute expiry (unix ms).
    pub expires_at_ms: Option<i64>,
    /// Creation time (unix ms).
    pub created_at_ms: i64,
    /// Last mutation time (unix ms).
    pub updated_at_ms: i64,
    /// Last validation time (unix ms).
    pub last_used_at_ms: Option<i64>,
    /// Advisory lifetime usage counters.
    pub usage_stats: UsageStats,
}

// ============================================================================
// SECTION: Patch
// ============================================================================

/// Partial update for the mutable credential fields.
///
/// A patch with every field `None` is rejected by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPatch {
    /// Replacement display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement description (`Some("")` clears it).
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement capability set.
    #[serde(default)]
    pub permissions: Option<BTreeSet<Permission>>,
    /// Replacement rate-limit ceilings.
    #[serde(default)]
    pub rate_limit: Option<RateLimitPolicy>,
    /// Replacement active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CredentialPatch {
    /// Returns true when the patch contains no recognized mutable field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.permissions.is_none()
            && self.rate_limit.is_none()
            && self.is_active.is_none()
    }
}

// ============================================================================
// SECTION: Caller Identity
// ============================================================================

/// Role asserted for a management caller by the external identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    /// Regular user; may manage only credentials they own.
    User,
    /// Privileged operator; may manage any credential.
    Admin,
}

impl CallerRole {
    /// Returns true when the role may act on credentials of any owner.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Authenticated caller identity supplied by the external identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Principal identifier of the caller.
    pub caller_id: OwnerId,
    /// Role asserted for the caller.
    pub role: CallerRole,
}

impl CallerIdentity {
    /// Builds a caller identity.
    #[must_use]
    pub fn new(caller_id: impl Into<OwnerId>, role: CallerRole) -> Self {
        Self {
            caller_id: caller_id.into(),
            role,
        }
    }

    /// Returns true when the caller may act on credentials owned by `owner`.
    #[must_use]
    pub fn may_manage(&self, owner: &OwnerId) -> bool {
        self.role.is_privileged() || self.caller_id == *owner
    }
}
