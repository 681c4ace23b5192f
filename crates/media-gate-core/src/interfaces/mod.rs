// crates/media-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Media Gate Interfaces
// Description: Backend-agnostic interfaces for key storage, counters, audit.
// Purpose: Define the contract surfaces used by the Media Gate runtime.
// Dependencies: crate::core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how Media Gate integrates with durable stores without
//! embedding backend-specific details. The Key Store and Counter Store are
//! the only shared mutable resources in the system; every mutation they
//! expose is atomic and conditional. Implementations must fail closed on
//! missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::CredentialRecord;
use crate::core::Granularity;
use crate::core::KeyId;
use crate::core::OwnerId;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Errors surfaced by Key Store and Counter Store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Conditional create refused; the key already exists.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// Input or stored data failed validation.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Transient infrastructure failure; the only retryable class.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Internal store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl StoreError {
    /// Returns true when the error is transient and a bounded retry is
    /// permitted. Logical failures are never retryable.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// ============================================================================
// SECTION: Key Store
// ============================================================================

/// Durable credential record storage keyed by credential identifier, with a
/// secondary index by owning principal.
pub trait KeyStore: Send + Sync {
    /// Inserts a new credential record.
    ///
    /// The insert is conditional: it must refuse a duplicate `key_id`
    /// atomically rather than overwrite.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the key id already exists, or
    /// another [`StoreError`] on storage failure.
    fn insert(&self, record: &CredentialRecord) -> Result<(), StoreError>;

    /// Loads a credential record by key id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn get(&self, key_id: &KeyId) -> Result<Option<CredentialRecord>, StoreError>;

    /// Lists credential records for an owner, ordered by key id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<CredentialRecord>, StoreError>;

    /// Replaces an existing credential record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when no record exists for the key id,
    /// or another [`StoreError`] on storage failure.
    fn update(&self, record: &CredentialRecord) -> Result<(), StoreError>;

    /// Deletes a credential record. Returns true when a record was removed.
    ///
    /// From the moment the delete commits, validation lookups must miss.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn delete(&self, key_id: &KeyId) -> Result<bool, StoreError>;

    /// Atomically adjusts the credential's advisory usage stats: total
    /// requests plus exactly one of successful/failed, refreshing the
    /// last-used timestamps.
    ///
    /// Missing records are a no-op; the credential may have been deleted
    /// between the decision and this advisory update.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn record_usage(
        &self,
        key_id: &KeyId,
        outcome: UsageOutcome,
        now_ms: i64,
    ) -> Result<(), StoreError>;
}

/// Validation outcome recorded against a credential's usage stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    /// The request was validated and admitted.
    Success,
    /// The request failed validation or was rate limited.
    Failure,
}

// ============================================================================
// SECTION: Counter Store
// ============================================================================

/// Durable key for one time-windowed usage counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WindowKey {
    /// Credential identifier.
    pub key_id: KeyId,
    /// Window granularity.
    pub granularity: Granularity,
    /// Window start (unix ms, truncated to the granularity boundary).
    pub window_start_ms: i64,
}

impl WindowKey {
    /// Builds the window key for a credential at the provided time.
    #[must_use]
    pub fn at(key_id: &KeyId, granularity: Granularity, now_ms: i64) -> Self {
        Self {
            key_id: key_id.clone(),
            granularity,
            window_start_ms: granularity.window_start_ms(now_ms),
        }
    }
}

/// Outcome of an atomic increment-if-below-limit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAdmission {
    /// The increment was applied; `count` is the value after the increment.
    Admitted {
        /// Counter value after the increment.
        count: u32,
    },
    /// The increment was refused because it would exceed the ceiling;
    /// `count` is the unchanged value.
    Refused {
        /// Counter value at the time of refusal.
        count: u32,
    },
}

/// Durable storage for time-windowed usage counters.
///
/// # Invariants
/// - `increment_if_below` is linearizable with respect to concurrent calls
///   on the same window key; no read-modify-write race is tolerable.
/// - Counters expire no later than window end plus a small safety margin,
///   without relying on prior observers to garbage-collect: expired rows
///   must read as absent.
pub trait CounterStore: Send + Sync {
    /// Atomically increments the counter unless the result would exceed
    /// `limit`. Creates the counter lazily on first use in a window, with
    /// expiry at `expires_at_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure; quota refusals are
    /// reported through [`WindowAdmission::Refused`], never as errors.
    fn increment_if_below(
        &self,
        key: &WindowKey,
        limit: u32,
        expires_at_ms: i64,
        now_ms: i64,
    ) -> Result<WindowAdmission, StoreError>;

    /// Decrements the counter, saturating at zero. Used to roll back
    /// smaller-window increments when a larger window refuses a request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn decrement(&self, key: &WindowKey, now_ms: i64) -> Result<(), StoreError>;

    /// Returns the current counter value, treating expired rows as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn count(&self, key: &WindowKey, now_ms: i64) -> Result<u32, StoreError>;

    /// Removes counters whose expiry has passed. Space reclamation only;
    /// correctness never depends on this being called.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn purge_expired(&self, now_ms: i64) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink for gateway decisions and registry mutations.
pub trait GateAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// Structured audit event emitted once per decision or mutation.
#[derive(Debug, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision or mutation outcome label.
    outcome: &'static str,
    /// Diagnostic reason label (deny events and failures).
    reason: Option<String>,
    /// Credential identifier when resolved.
    key_id: Option<String>,
    /// Hashed token fingerprint; never plaintext secret material.
    token_fingerprint: Option<String>,
    /// Binding granularity label for rate-limit denials.
    granularity: Option<&'static str>,
}

impl GateAuditEvent {
    /// Builds an allow event for an admitted request.
    #[must_use]
    pub fn admitted(key_id: &KeyId, token_fingerprint: String) -> Self {
        Self {
            event: "gate_decision",
            outcome: "allow",
            reason: None,
            key_id: Some(key_id.as_str().to_string()),
            token_fingerprint: Some(token_fingerprint),
            granularity: None,
        }
    }

    /// Builds a deny event with a diagnostic reason label.
    #[must_use]
    pub fn denied(
        reason: impl Into<String>,
        key_id: Option<&KeyId>,
        granularity: Option<Granularity>,
    ) -> Self {
        Self {
            event: "gate_decision",
            outcome: "deny",
            reason: Some(reason.into()),
            key_id: key_id.map(|id| id.as_str().to_string()),
            token_fingerprint: None,
            granularity: granularity.map(Granularity::label),
        }
    }

    /// Builds an allow event for a request admitted without quota
    /// accounting under the fail-open outage policy.
    #[must_use]
    pub fn degraded_allow(key_id: &KeyId, reason: impl Into<String>) -> Self {
        Self {
            event: "gate_decision",
            outcome: "allow_degraded",
            reason: Some(reason.into()),
            key_id: Some(key_id.as_str().to_string()),
            token_fingerprint: None,
            granularity: None,
        }
    }

    /// Builds a registry mutation event.
    #[must_use]
    pub fn registry(operation: &'static str, key_id: &KeyId) -> Self {
        Self {
            event: "key_registry",
            outcome: operation,
            reason: None,
            key_id: Some(key_id.as_str().to_string()),
            token_fingerprint: None,
            granularity: None,
        }
    }

    /// Builds an event for a swallowed usage-recording failure.
    #[must_use]
    pub fn usage_record_failed(key_id: &KeyId, reason: impl Into<String>) -> Self {
        Self {
            event: "usage_record",
            outcome: "failed",
            reason: Some(reason.into()),
            key_id: Some(key_id.as_str().to_string()),
            token_fingerprint: None,
            granularity: None,
        }
    }
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl GateAuditSink for StderrAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        #[allow(clippy::print_stderr, reason = "Stderr is this sink's output channel.")]
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl GateAuditSink for NoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}
