// crates/media-gate-core/tests/gateway.rs
// ============================================================================
// Module: Auth Gateway Tests
// Description: End-to-end decision pipeline coverage.
// Purpose: Ensure validation, rate limiting, usage recording, and outage
//          policy compose into correct decisions.
// ============================================================================

//! ## Overview
//! Drives the gateway end to end over in-memory stores with a fixed clock:
//! allow decisions, flattened unauthorized denials, rate-limit denials with
//! retry-after, usage attribution, and both outage policies against a
//! counter store that always fails.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use media_gate_core::ALL_PERMISSIONS;
use media_gate_core::AuthGateway;
use media_gate_core::CallerIdentity;
use media_gate_core::CallerRole;
use media_gate_core::CounterStore;
use media_gate_core::CreateKeyRequest;
use media_gate_core::DeniedReason;
use media_gate_core::FixedClock;
use media_gate_core::InMemoryCounterStore;
use media_gate_core::InMemoryKeyStore;
use media_gate_core::IssuedCredential;
use media_gate_core::KeyRegistry;
use media_gate_core::NoopAuditSink;
use media_gate_core::OutagePolicy;
use media_gate_core::OwnerId;
use media_gate_core::Permission;
use media_gate_core::RateLimitPolicy;
use media_gate_core::SharedCounterStore;
use media_gate_core::SharedKeyStore;
use media_gate_core::StoreError;
use media_gate_core::WindowAdmission;
use media_gate_core::WindowKey;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const NOW_MS: i64 = 1_700_000_000_000;

/// Counter store that is permanently unavailable.
struct OutageCounterStore;

impl CounterStore for OutageCounterStore {
    fn increment_if_below(
        &self,
        _key: &WindowKey,
        _limit: u32,
        _expires_at_ms: i64,
        _now_ms: i64,
    ) -> Result<WindowAdmission, StoreError> {
        Err(StoreError::Unavailable("simulated outage".to_string()))
    }

    fn decrement(&self, _key: &WindowKey, _now_ms: i64) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("simulated outage".to_string()))
    }

    fn count(&self, _key: &WindowKey, _now_ms: i64) -> Result<u32, StoreError> {
        Err(StoreError::Unavailable("simulated outage".to_string()))
    }

    fn purge_expired(&self, _now_ms: i64) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("simulated outage".to_string()))
    }
}

struct Fixture {
    registry: KeyRegistry,
    gateway: AuthGateway,
    clock: Arc<FixedClock>,
}

fn fixture() -> Fixture {
    fixture_with(
        SharedCounterStore::from_store(InMemoryCounterStore::new()),
        OutagePolicy::FailClosed,
    )
}

fn fixture_with(counters: SharedCounterStore, outage_policy: OutagePolicy) -> Fixture {
    let keys = SharedKeyStore::from_store(InMemoryKeyStore::new());
    let clock = Arc::new(FixedClock::new(NOW_MS));
    let registry = KeyRegistry::new(
        keys.clone(),
        clock.clone(),
        Arc::new(NoopAuditSink),
        RateLimitPolicy {
            per_minute: 10,
            per_hour: 100,
            per_day: 1_000,
        },
        ALL_PERMISSIONS.iter().copied().collect(),
    );
    let gateway =
        AuthGateway::new(keys, counters, clock.clone(), Arc::new(NoopAuditSink), outage_policy);
    Fixture {
        registry,
        gateway,
        clock,
    }
}

fn issue(fixture: &Fixture, per_minute: u32) -> IssuedCredential {
    fixture
        .registry
        .create(CreateKeyRequest {
            owner_id: OwnerId::new("alice"),
            name: "worker".to_string(),
            description: None,
            permissions: [Permission::MediaRead].into_iter().collect(),
            rate_limit_override: Some(RateLimitPolicy {
                per_minute,
                per_hour: 1_000,
                per_day: 10_000,
            }),
            expires_at_ms: None,
        })
        .unwrap()
}

fn alice() -> CallerIdentity {
    CallerIdentity::new("alice", CallerRole::User)
}

// ============================================================================
// SECTION: Allow Path
// ============================================================================

#[test]
fn valid_token_is_admitted_with_credential() {
    let fixture = fixture();
    let issued = issue(&fixture, 10);
    let decision = fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]);
    assert!(decision.admitted);
    let credential = decision.credential.unwrap();
    assert_eq!(credential.key_id, issued.credential.key_id);
    assert!(decision.denied_reason.is_none());
    assert!(decision.retry_after_seconds.is_none());
}

#[test]
fn admitted_request_updates_usage_stats() {
    let fixture = fixture();
    let issued = issue(&fixture, 10);
    let decision = fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]);
    assert!(decision.admitted);
    let credential = fixture.registry.get(&issued.credential.key_id, &alice()).unwrap();
    assert_eq!(credential.usage_stats.total_requests, 1);
    assert_eq!(credential.usage_stats.successful_requests, 1);
    assert_eq!(credential.usage_stats.failed_requests, 0);
    assert_eq!(credential.usage_stats.last_request_at_ms, Some(NOW_MS));
    assert_eq!(credential.last_used_at_ms, Some(NOW_MS));
}

// ============================================================================
// SECTION: Unauthorized Path
// ============================================================================

#[test]
fn malformed_token_is_unauthorized() {
    let fixture = fixture();
    let decision = fixture.gateway.authorize("no-separator", &[]);
    assert!(!decision.admitted);
    assert_eq!(decision.denied_reason, Some(DeniedReason::Unauthorized));
    assert!(decision.credential.is_none());
}

#[test]
fn unknown_key_is_unauthorized() {
    let fixture = fixture();
    let decision = fixture.gateway.authorize("mgk_missing.secret", &[]);
    assert_eq!(decision.denied_reason, Some(DeniedReason::Unauthorized));
}

#[test]
fn wrong_secret_is_unauthorized_and_recorded_as_failure() {
    let fixture = fixture();
    let issued = issue(&fixture, 10);
    let forged = format!("{}.{}", issued.credential.key_id.as_str(), "wrong-secret");
    let decision = fixture.gateway.authorize(&forged, &[Permission::MediaRead]);
    assert_eq!(decision.denied_reason, Some(DeniedReason::Unauthorized));

    let credential = fixture.registry.get(&issued.credential.key_id, &alice()).unwrap();
    assert_eq!(credential.usage_stats.total_requests, 1);
    assert_eq!(credential.usage_stats.failed_requests, 1);
    assert_eq!(credential.usage_stats.successful_requests, 0);
}

#[test]
fn missing_permission_is_indistinguishable_from_other_failures() {
    let fixture = fixture();
    let issued = issue(&fixture, 10);
    let decision = fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaDelete]);
    assert_eq!(decision.denied_reason, Some(DeniedReason::Unauthorized));
    assert!(decision.retry_after_seconds.is_none());
}

#[test]
fn deleted_key_is_unauthorized_immediately() {
    let fixture = fixture();
    let issued = issue(&fixture, 10);
    fixture.registry.delete(&issued.credential.key_id, &alice()).unwrap();
    let decision = fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]);
    assert_eq!(decision.denied_reason, Some(DeniedReason::Unauthorized));
}

// ============================================================================
// SECTION: Rate-Limited Path
// ============================================================================

#[test]
fn requests_beyond_minute_ceiling_are_rate_limited() {
    let fixture = fixture();
    let issued = issue(&fixture, 2);
    for _ in 0..2 {
        let decision =
            fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]);
        assert!(decision.admitted);
    }
    let decision = fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]);
    assert!(!decision.admitted);
    assert_eq!(decision.denied_reason, Some(DeniedReason::RateLimited));
    let retry_after = decision.retry_after_seconds.unwrap();
    assert!((1..=60).contains(&retry_after), "retry-after must fit the minute window");
}

#[test]
fn rate_limited_request_counts_as_failed_usage() {
    let fixture = fixture();
    let issued = issue(&fixture, 1);
    assert!(fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]).admitted);
    assert!(!fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]).admitted);
    let credential = fixture.registry.get(&issued.credential.key_id, &alice()).unwrap();
    assert_eq!(credential.usage_stats.total_requests, 2);
    assert_eq!(credential.usage_stats.successful_requests, 1);
    assert_eq!(credential.usage_stats.failed_requests, 1);
}

#[test]
fn next_minute_window_admits_again() {
    let fixture = fixture();
    let issued = issue(&fixture, 1);
    assert!(fixture.gateway.authorize(&issued.plaintext_token, &[]).admitted);
    assert!(!fixture.gateway.authorize(&issued.plaintext_token, &[]).admitted);
    fixture.clock.set(NOW_MS + 60_000);
    assert!(fixture.gateway.authorize(&issued.plaintext_token, &[]).admitted);
}

#[test]
fn updated_ceiling_applies_to_future_requests() {
    let fixture = fixture();
    let issued = issue(&fixture, 1);
    assert!(fixture.gateway.authorize(&issued.plaintext_token, &[]).admitted);
    assert!(!fixture.gateway.authorize(&issued.plaintext_token, &[]).admitted);

    let patch = media_gate_core::CredentialPatch {
        rate_limit: Some(RateLimitPolicy {
            per_minute: 5,
            per_hour: 1_000,
            per_day: 10_000,
        }),
        ..media_gate_core::CredentialPatch::default()
    };
    fixture.registry.update(&issued.credential.key_id, &alice(), &patch).unwrap();
    assert!(
        fixture.gateway.authorize(&issued.plaintext_token, &[]).admitted,
        "raised ceiling should admit within the same window"
    );
}

// ============================================================================
// SECTION: Outage Policy
// ============================================================================

#[test]
fn fail_closed_denies_during_counter_outage() {
    let fixture =
        fixture_with(SharedCounterStore::from_store(OutageCounterStore), OutagePolicy::FailClosed);
    let issued = issue(&fixture, 10);
    let decision = fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]);
    assert!(!decision.admitted);
    assert_eq!(decision.denied_reason, Some(DeniedReason::StoreUnavailable));
}

#[test]
fn fail_open_admits_during_counter_outage() {
    let fixture =
        fixture_with(SharedCounterStore::from_store(OutageCounterStore), OutagePolicy::FailOpen);
    let issued = issue(&fixture, 10);
    let decision = fixture.gateway.authorize(&issued.plaintext_token, &[Permission::MediaRead]);
    assert!(decision.admitted, "fail-open must admit validated requests");
    assert!(decision.credential.is_some());
}

#[test]
fn fail_open_still_requires_valid_credentials() {
    let fixture =
        fixture_with(SharedCounterStore::from_store(OutageCounterStore), OutagePolicy::FailOpen);
    let decision = fixture.gateway.authorize("mgk_missing.secret", &[]);
    assert!(!decision.admitted, "fail-open never bypasses validation");
    assert_eq!(decision.denied_reason, Some(DeniedReason::Unauthorized));
}
