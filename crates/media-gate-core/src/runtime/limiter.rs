// crates/media-gate-core/src/runtime/limiter.rs
// ============================================================================
// Module: Media Gate Rate Limiter
// Description: Fixed-window quota enforcement over three UTC windows.
// Purpose: Bound delivered request rate to configured ceilings under
//          concurrent stateless workers.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Admission uses fixed-window counting with three independent windows per
//! credential (minute, hour, day). Windows are attempted smallest to
//! largest; each attempt is an atomic increment-if-below-limit against the
//! Counter Store. When a window refuses, every smaller-window increment
//! already applied for the request is rolled back, so a rejected request
//! never consumes quota. Correctness hinges on the store's linearizable
//! conditional increment, not on any in-process lock; there is no shared
//! process across invocations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::GRANULARITIES_ASCENDING;
use crate::core::Granularity;
use crate::core::KeyId;
use crate::core::RateLimitPolicy;
use crate::interfaces::CounterStore;
use crate::interfaces::StoreError;
use crate::interfaces::WindowAdmission;
use crate::interfaces::WindowKey;
use crate::runtime::retry::with_transient_retries;
use crate::runtime::store::SharedCounterStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Safety margin added to a counter's natural window end before the store
/// may drop it.
pub const WINDOW_EXPIRY_MARGIN_MS: i64 = 5_000;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Rejection detail for a rate-limited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRejection {
    /// The granularity whose ceiling bound the request.
    pub granularity: Granularity,
    /// Seconds until the binding window rolls over (rounded up, minimum 1).
    pub retry_after_seconds: u64,
}

/// Rate limiter errors.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Counter store failure during admission.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// All three windows admitted the request and recorded it durably.
    Admitted,
    /// A window refused the request; no quota was consumed.
    Rejected(RateLimitRejection),
}

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// Multi-window rate limiter backed by the Counter Store.
pub struct RateLimiter {
    /// Durable windowed counters.
    counters: SharedCounterStore,
}

impl RateLimiter {
    /// Builds a limiter over the shared counter store.
    #[must_use]
    pub const fn new(counters: SharedCounterStore) -> Self {
        Self {
            counters,
        }
    }

    /// Decides admit/reject for one request by a validated credential, and
    /// if admitted, durably records it in all three windows.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Store`] when the counter store fails after
    /// bounded transient retries. Already-applied increments are rolled back
    /// best-effort before the error is returned; the caller applies the
    /// configured outage policy.
    pub fn check(
        &self,
        key_id: &KeyId,
        rate_limit: &RateLimitPolicy,
        now_ms: i64,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let mut applied: Vec<WindowKey> = Vec::with_capacity(GRANULARITIES_ASCENDING.len());
        for granularity in GRANULARITIES_ASCENDING {
            let key = WindowKey::at(key_id, granularity, now_ms);
            let expires_at_ms =
                key.window_start_ms + granularity.duration_ms() + WINDOW_EXPIRY_MARGIN_MS;
            let limit = rate_limit.ceiling(granularity);
            let admission = match with_transient_retries(|| {
                self.counters.increment_if_below(&key, limit, expires_at_ms, now_ms)
            }) {
                Ok(admission) => admission,
                Err(error) => {
                    self.rollback(&applied, now_ms);
                    return Err(RateLimitError::Store(error));
                }
            };
            match admission {
                WindowAdmission::Admitted {
                    ..
                } => applied.push(key),
                WindowAdmission::Refused {
                    ..
                } => {
                    // A rejected request must never consume quota.
                    self.rollback(&applied, now_ms);
                    return Ok(RateLimitDecision::Rejected(RateLimitRejection {
                        granularity,
                        retry_after_seconds: retry_after_seconds(granularity, now_ms),
                    }));
                }
            }
        }
        Ok(RateLimitDecision::Admitted)
    }

    /// Rolls back increments applied for a request that will not proceed.
    ///
    /// Best-effort: a failed decrement leaves bounded drift (at most one
    /// request per failure) and is not retried beyond the store's own
    /// transient policy.
    fn rollback(&self, applied: &[WindowKey], now_ms: i64) {
        for key in applied {
            let _ = with_transient_retries(|| self.counters.decrement(key, now_ms));
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Computes the retry-after duration `window_start + duration - now` in
/// whole seconds, rounded up and never below one.
fn retry_after_seconds(granularity: Granularity, now_ms: i64) -> u64 {
    let remaining_ms = granularity.remaining_ms(now_ms).max(1);
    let seconds = remaining_ms.div_euclid(1_000) + i64::from(remaining_ms.rem_euclid(1_000) > 0);
    u64::try_from(seconds.max(1)).unwrap_or(1)
}
