// crates/media-gate-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Conformance tests for the SQLite Key Store and Counter Store.
// Purpose: Ensure durable persistence, atomic conditional writes, and expiry
//          semantics.
// ============================================================================

//! ## Overview
//! Conformance tests for the `SQLite`-backed stores: credential round trips,
//! duplicate refusal, usage-stat accumulation, windowed counter ceilings
//! under thread contention, and expired-row semantics. Each test opens a
//! fresh database under a temp directory.

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

use std::collections::BTreeSet;
use std::thread;

use media_gate_core::CounterStore;
use media_gate_core::CredentialRecord;
use media_gate_core::Granularity;
use media_gate_core::KeyId;
use media_gate_core::KeyStore;
use media_gate_core::OwnerId;
use media_gate_core::Permission;
use media_gate_core::RateLimitPolicy;
use media_gate_core::StoreError;
use media_gate_core::UsageOutcome;
use media_gate_core::UsageStats;
use media_gate_core::WindowAdmission;
use media_gate_core::WindowKey;
use media_gate_core::hash_secret;
use media_gate_store_sqlite::SqliteGateStore;
use media_gate_store_sqlite::SqliteStoreConfig;
use media_gate_store_sqlite::SqliteStoreMode;
use media_gate_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const NOW_MS: i64 = 1_700_000_000_000;

fn store_for(path: &std::path::Path) -> SqliteGateStore {
    let config = SqliteStoreConfig {
        path: path.to_path_buf(),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
    };
    SqliteGateStore::open(&config).expect("store init")
}

fn sample_record(key_id: &str) -> CredentialRecord {
    let permissions: BTreeSet<Permission> =
        [Permission::MediaRead, Permission::MediaAnalyze].into_iter().collect();
    CredentialRecord {
        key_id: KeyId::new(key_id),
        secret_hash: hash_secret("test-secret"),
        owner_id: OwnerId::new("alice"),
        name: "worker".to_string(),
        description: Some("ingest worker".to_string()),
        permissions,
        rate_limit: RateLimitPolicy {
            per_minute: 10,
            per_hour: 100,
            per_day: 1_000,
        },
        is_active: true,
        expires_at_ms: None,
        created_at_ms: NOW_MS,
        updated_at_ms: NOW_MS,
        last_used_at_ms: None,
        usage_stats: UsageStats::default(),
    }
}

fn window(key_id: &str) -> WindowKey {
    WindowKey::at(&KeyId::new(key_id), Granularity::Minute, NOW_MS)
}

// ============================================================================
// SECTION: Key Store Tests
// ============================================================================

#[test]
fn credential_roundtrip_preserves_every_field() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let record = sample_record("mgk_roundtrip");
    store.insert(&record).unwrap();
    let loaded = store.get(&record.key_id).unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn duplicate_insert_is_refused_as_conflict() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let record = sample_record("mgk_dup");
    store.insert(&record).unwrap();
    let result = store.insert(&record);
    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[test]
fn list_by_owner_returns_only_that_owner() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    store.insert(&sample_record("mgk_a")).unwrap();
    store.insert(&sample_record("mgk_b")).unwrap();
    let mut other = sample_record("mgk_c");
    other.owner_id = OwnerId::new("bob");
    store.insert(&other).unwrap();

    let records = store.list_by_owner(&OwnerId::new("alice")).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.owner_id == OwnerId::new("alice")));
}

#[test]
fn update_replaces_mutable_fields() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let mut record = sample_record("mgk_update");
    store.insert(&record).unwrap();
    record.name = "renamed".to_string();
    record.is_active = false;
    record.rate_limit.per_minute = 3;
    record.updated_at_ms = NOW_MS + 1_000;
    store.update(&record).unwrap();

    let loaded = store.get(&record.key_id).unwrap().unwrap();
    assert_eq!(loaded.name, "renamed");
    assert!(!loaded.is_active);
    assert_eq!(loaded.rate_limit.per_minute, 3);
    assert_eq!(loaded.updated_at_ms, NOW_MS + 1_000);
}

#[test]
fn update_of_missing_record_fails() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let result = store.update(&sample_record("mgk_missing"));
    assert!(matches!(result, Err(StoreError::Invalid(_))));
}

#[test]
fn delete_removes_and_reports() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let record = sample_record("mgk_delete");
    store.insert(&record).unwrap();
    assert!(store.delete(&record.key_id).unwrap());
    assert!(store.get(&record.key_id).unwrap().is_none());
    assert!(!store.delete(&record.key_id).unwrap(), "second delete reports absence");
}

#[test]
fn record_usage_accumulates_stats() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let record = sample_record("mgk_usage");
    store.insert(&record).unwrap();

    store.record_usage(&record.key_id, UsageOutcome::Success, NOW_MS + 10).unwrap();
    store.record_usage(&record.key_id, UsageOutcome::Failure, NOW_MS + 20).unwrap();
    store.record_usage(&record.key_id, UsageOutcome::Success, NOW_MS + 30).unwrap();

    let loaded = store.get(&record.key_id).unwrap().unwrap();
    assert_eq!(loaded.usage_stats.total_requests, 3);
    assert_eq!(loaded.usage_stats.successful_requests, 2);
    assert_eq!(loaded.usage_stats.failed_requests, 1);
    assert_eq!(loaded.usage_stats.last_request_at_ms, Some(NOW_MS + 30));
    assert_eq!(loaded.last_used_at_ms, Some(NOW_MS + 30));
}

#[test]
fn record_usage_for_missing_key_is_a_noop() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    store.record_usage(&KeyId::new("mgk_gone"), UsageOutcome::Success, NOW_MS).unwrap();
}

#[test]
fn records_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("gate.db");
    let record = sample_record("mgk_durable");
    {
        let store = store_for(&path);
        store.insert(&record).unwrap();
    }
    let reopened = store_for(&path);
    let loaded = reopened.get(&record.key_id).unwrap().unwrap();
    assert_eq!(loaded, record);
}

// ============================================================================
// SECTION: Counter Store Tests
// ============================================================================

#[test]
fn increment_admits_until_limit_then_refuses() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let key = window("mgk_counter");
    let expires = NOW_MS + 65_000;
    for expected in 1..=3u32 {
        let admission = store.increment_if_below(&key, 3, expires, NOW_MS).unwrap();
        assert_eq!(admission, WindowAdmission::Admitted { count: expected });
    }
    let admission = store.increment_if_below(&key, 3, expires, NOW_MS).unwrap();
    assert_eq!(admission, WindowAdmission::Refused { count: 3 });
}

#[test]
fn decrement_saturates_at_zero() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let key = window("mgk_dec");
    let expires = NOW_MS + 65_000;
    store.increment_if_below(&key, 10, expires, NOW_MS).unwrap();
    store.decrement(&key, NOW_MS).unwrap();
    store.decrement(&key, NOW_MS).unwrap();
    assert_eq!(store.count(&key, NOW_MS).unwrap(), 0);
}

#[test]
fn expired_rows_read_as_absent_and_reset_on_increment() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let key = window("mgk_expiry");
    let expires = NOW_MS + 1_000;
    store.increment_if_below(&key, 5, expires, NOW_MS).unwrap();
    assert_eq!(store.count(&key, NOW_MS).unwrap(), 1);

    let later = expires + 1;
    assert_eq!(store.count(&key, later).unwrap(), 0, "expired row reads as absent");
    let admission = store.increment_if_below(&key, 5, later + 65_000, later).unwrap();
    assert_eq!(admission, WindowAdmission::Admitted { count: 1 }, "stale row is reset");
}

#[test]
fn increments_sweep_stale_rows_from_earlier_cycles() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let old = window("mgk_sweep_old");
    store.increment_if_below(&old, 5, NOW_MS + 1_000, NOW_MS).unwrap();

    let later = NOW_MS + 120_000;
    let fresh = WindowKey::at(&KeyId::new("mgk_sweep_new"), Granularity::Minute, later);
    store.increment_if_below(&fresh, 5, later + 65_000, later).unwrap();

    assert_eq!(store.purge_expired(later).unwrap(), 0, "the increment already swept stale rows");
    assert_eq!(store.count(&fresh, later).unwrap(), 1);
}

#[test]
fn purge_expired_removes_only_stale_rows() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let stale = window("mgk_stale");
    let fresh = window("mgk_fresh");
    store.increment_if_below(&stale, 5, NOW_MS + 1_000, NOW_MS).unwrap();
    store.increment_if_below(&fresh, 5, NOW_MS + 100_000, NOW_MS).unwrap();

    let removed = store.purge_expired(NOW_MS + 2_000).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.count(&fresh, NOW_MS + 2_000).unwrap(), 1);
}

#[test]
fn distinct_granularities_count_independently() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let key_id = KeyId::new("mgk_grains");
    let minute = WindowKey::at(&key_id, Granularity::Minute, NOW_MS);
    let hour = WindowKey::at(&key_id, Granularity::Hour, NOW_MS);
    store.increment_if_below(&minute, 5, NOW_MS + 65_000, NOW_MS).unwrap();
    store.increment_if_below(&minute, 5, NOW_MS + 65_000, NOW_MS).unwrap();
    store.increment_if_below(&hour, 5, NOW_MS + 3_605_000, NOW_MS).unwrap();
    assert_eq!(store.count(&minute, NOW_MS).unwrap(), 2);
    assert_eq!(store.count(&hour, NOW_MS).unwrap(), 1);
}

#[test]
fn concurrent_increments_never_exceed_the_limit() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("gate.db"));
    let limit = 5u32;
    let threads = 16;
    let expires = NOW_MS + 65_000;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                store.increment_if_below(&window("mgk_race"), limit, expires, NOW_MS).unwrap()
            })
        })
        .collect();
    let admitted = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|admission| matches!(admission, WindowAdmission::Admitted { .. }))
        .count();
    assert_eq!(admitted, limit as usize, "exactly the ceiling must be admitted");
    assert_eq!(store.count(&window("mgk_race"), NOW_MS).unwrap(), limit);
}
