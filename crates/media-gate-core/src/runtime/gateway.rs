// crates/media-gate-core/src/runtime/gateway.rs
// ============================================================================
// Module: Media Gate Auth Gateway
// Description: Per-request composition of validator, limiter, and recorder.
// Purpose: Produce a single allow/deny decision for the calling handler.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The gateway is the composition root for request authorization: it runs
//! the credential validator, then the rate limiter, then the best-effort
//! usage recorder, and returns one [`AccessDecision`] to the calling
//! handler. All validation failure kinds are flattened to a uniform
//! unauthorized outcome; the diagnostic distinction survives only in audit
//! events. Store outage during rate-limit evaluation follows the configured
//! outage policy and fails closed by default.
//!
//! Security posture: fail closed; no positive validation result is cached
//! across requests, and audit events carry hashed fingerprints only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;

use crate::core::Clock;
use crate::core::Credential;
use crate::core::DEFAULT_HASH_ALGORITHM;
use crate::core::Permission;
use crate::core::hash_bytes;
use crate::interfaces::GateAuditEvent;
use crate::interfaces::GateAuditSink;
use crate::interfaces::UsageOutcome;
use crate::runtime::limiter::RateLimitDecision;
use crate::runtime::limiter::RateLimiter;
use crate::runtime::recorder::UsageRecorder;
use crate::runtime::store::SharedCounterStore;
use crate::runtime::store::SharedKeyStore;
use crate::runtime::validator::CredentialValidator;

// ============================================================================
// SECTION: Outage Policy
// ============================================================================

/// Behavior when the counter store is unavailable during rate limiting.
///
/// Fail-closed is the default: fail-open would silently disable quota
/// enforcement for the duration of the outage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutagePolicy {
    /// Reject requests while the counter store is unavailable.
    #[default]
    FailClosed,
    /// Admit requests without quota accounting while the counter store is
    /// unavailable. Explicit opt-in.
    FailOpen,
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Reason a request was denied, as surfaced to the calling handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedReason {
    /// Credential validation failed; deliberately undifferentiated.
    Unauthorized,
    /// A quota window refused the request.
    RateLimited,
    /// A required store was unavailable and the policy is fail-closed.
    StoreUnavailable,
}

/// Decision output consumed by the calling handler.
#[derive(Debug, Clone, Serialize)]
pub struct AccessDecision {
    /// Whether the request may proceed.
    pub admitted: bool,
    /// The validated credential when admitted.
    pub credential: Option<Credential>,
    /// Denial reason when not admitted.
    pub denied_reason: Option<DeniedReason>,
    /// Seconds until retry is worthwhile, for rate-limited denials.
    pub retry_after_seconds: Option<u64>,
}

impl AccessDecision {
    /// Builds an admitted decision.
    #[must_use]
    const fn allow(credential: Credential) -> Self {
        Self {
            admitted: true,
            credential: Some(credential),
            denied_reason: None,
            retry_after_seconds: None,
        }
    }

    /// Builds a denied decision.
    #[must_use]
    const fn deny(reason: DeniedReason, retry_after_seconds: Option<u64>) -> Self {
        Self {
            admitted: false,
            credential: None,
            denied_reason: Some(reason),
            retry_after_seconds,
        }
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Composition root orchestrating validation, rate limiting, and usage
/// recording for each inbound request.
///
/// Constructed explicitly at process startup from shared store handles; the
/// gateway holds no per-request state and may be shared across workers.
pub struct AuthGateway {
    /// Credential validator.
    validator: CredentialValidator,
    /// Multi-window rate limiter.
    limiter: RateLimiter,
    /// Best-effort usage recorder.
    recorder: UsageRecorder,
    /// Injected wall clock.
    clock: Arc<dyn Clock>,
    /// Audit sink for decisions.
    audit: Arc<dyn GateAuditSink>,
    /// Counter-store outage policy.
    outage_policy: OutagePolicy,
}

impl AuthGateway {
    /// Builds a gateway from explicit collaborators.
    #[must_use]
    pub fn new(
        keys: SharedKeyStore,
        counters: SharedCounterStore,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn GateAuditSink>,
        outage_policy: OutagePolicy,
    ) -> Self {
        Self {
            validator: CredentialValidator::new(keys.clone()),
            limiter: RateLimiter::new(counters),
            recorder: UsageRecorder::new(keys, Arc::clone(&audit)),
            clock,
            audit,
            outage_policy,
        }
    }

    /// Authorizes one request presented with the given token and the
    /// endpoint's required permissions.
    ///
    /// Always returns a decision; infrastructure failures surface as denials
    /// per the outage policy rather than as errors.
    #[must_use]
    pub fn authorize(&self, token: &str, required_permissions: &[Permission]) -> AccessDecision {
        let now_ms = self.clock.now_ms();

        let validated = match self.validator.validate(token, required_permissions, now_ms) {
            Ok(validated) => validated,
            Err(failure) => {
                self.audit.record(&GateAuditEvent::denied(
                    failure.kind.label(),
                    failure.key_id.as_ref(),
                    None,
                ));
                if let Some(key_id) = &failure.key_id {
                    self.recorder.record(key_id, UsageOutcome::Failure, now_ms);
                }
                // Every validation failure kind is flattened to one outcome
                // so probing reveals nothing about which check failed.
                let reason = if failure.kind.is_store_failure() {
                    DeniedReason::StoreUnavailable
                } else {
                    DeniedReason::Unauthorized
                };
                return AccessDecision::deny(reason, None);
            }
        };
        let credential = validated.credential;
        let key_id = credential.key_id.clone();

        match self.limiter.check(&key_id, &credential.rate_limit, now_ms) {
            Ok(RateLimitDecision::Admitted) => {
                self.recorder.record(&key_id, UsageOutcome::Success, now_ms);
                let fingerprint =
                    hash_bytes(DEFAULT_HASH_ALGORITHM, token.as_bytes()).value;
                self.audit.record(&GateAuditEvent::admitted(&key_id, fingerprint));
                AccessDecision::allow(credential)
            }
            Ok(RateLimitDecision::Rejected(rejection)) => {
                self.recorder.record(&key_id, UsageOutcome::Failure, now_ms);
                self.audit.record(&GateAuditEvent::denied(
                    "rate_limited",
                    Some(&key_id),
                    Some(rejection.granularity),
                ));
                AccessDecision::deny(
                    DeniedReason::RateLimited,
                    Some(rejection.retry_after_seconds),
                )
            }
            Err(error) => match self.outage_policy {
                OutagePolicy::FailClosed => {
                    self.recorder.record(&key_id, UsageOutcome::Failure, now_ms);
                    self.audit.record(&GateAuditEvent::denied(
                        format!("counter_store_unavailable: {error}"),
                        Some(&key_id),
                        None,
                    ));
                    AccessDecision::deny(DeniedReason::StoreUnavailable, None)
                }
                OutagePolicy::FailOpen => {
                    self.recorder.record(&key_id, UsageOutcome::Success, now_ms);
                    self.audit.record(&GateAuditEvent::degraded_allow(
                        &key_id,
                        format!("counter_store_unavailable: {error}"),
                    ));
                    AccessDecision::allow(credential)
                }
            },
        }
    }

    /// Returns the configured outage policy.
    #[must_use]
    pub const fn outage_policy(&self) -> OutagePolicy {
        self.outage_policy
    }
}
