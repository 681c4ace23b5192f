// crates/media-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Media Gate In-Memory Stores
// Description: In-memory Key Store and Counter Store for tests and examples.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`KeyStore`] and
//! [`CounterStore`] for tests and local demos, plus shared `Arc` wrappers
//! used to hand one store to several runtime components. The in-memory
//! counter store honors the same expiry semantics as durable backends:
//! expired rows read as absent and are purged lazily.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::CredentialRecord;
use crate::core::KeyId;
use crate::core::OwnerId;
use crate::interfaces::CounterStore;
use crate::interfaces::KeyStore;
use crate::interfaces::StoreError;
use crate::interfaces::UsageOutcome;
use crate::interfaces::WindowAdmission;
use crate::interfaces::WindowKey;

// ============================================================================
// SECTION: In-Memory Key Store
// ============================================================================

/// In-memory key store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyStore {
    /// Credential records keyed by key id, protected by a mutex.
    records: Arc<Mutex<BTreeMap<KeyId, CredentialRecord>>>,
}

impl InMemoryKeyStore {
    /// Creates a new in-memory key store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl KeyStore for InMemoryKeyStore {
    fn insert(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("key store mutex poisoned".to_string()))?;
        if guard.contains_key(&record.key_id) {
            return Err(StoreError::Conflict(format!(
                "credential already exists: {}",
                record.key_id
            )));
        }
        guard.insert(record.key_id.clone(), record.clone());
        drop(guard);
        Ok(())
    }

    fn get(&self, key_id: &KeyId) -> Result<Option<CredentialRecord>, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("key store mutex poisoned".to_string()))?;
        Ok(guard.get(key_id).cloned())
    }

    fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<CredentialRecord>, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("key store mutex poisoned".to_string()))?;
        Ok(guard.values().filter(|record| record.owner_id == *owner_id).cloned().collect())
    }

    fn update(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("key store mutex poisoned".to_string()))?;
        let Some(existing) = guard.get_mut(&record.key_id) else {
            return Err(StoreError::Invalid(format!(
                "credential does not exist: {}",
                record.key_id
            )));
        };
        // Usage stats are written only through `record_usage`; a management
        // write must not clobber counters advanced since the caller's read.
        let mut replacement = record.clone();
        replacement.usage_stats = existing.usage_stats;
        replacement.last_used_at_ms = existing.last_used_at_ms;
        *existing = replacement;
        drop(guard);
        Ok(())
    }

    fn delete(&self, key_id: &KeyId) -> Result<bool, StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("key store mutex poisoned".to_string()))?;
        Ok(guard.remove(key_id).is_some())
    }

    fn record_usage(
        &self,
        key_id: &KeyId,
        outcome: UsageOutcome,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("key store mutex poisoned".to_string()))?;
        if let Some(record) = guard.get_mut(key_id) {
            record.usage_stats.total_requests = record.usage_stats.total_requests.saturating_add(1);
            match outcome {
                UsageOutcome::Success => {
                    record.usage_stats.successful_requests =
                        record.usage_stats.successful_requests.saturating_add(1);
                }
                UsageOutcome::Failure => {
                    record.usage_stats.failed_requests =
                        record.usage_stats.failed_requests.saturating_add(1);
                }
            }
            record.usage_stats.last_request_at_ms = Some(now_ms);
            record.last_used_at_ms = Some(now_ms);
        }
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Counter Store
// ============================================================================

/// One in-memory counter row.
#[derive(Debug, Clone, Copy)]
struct CounterRow {
    /// Current counter value.
    count: u32,
    /// Expiry time (unix ms); the row reads as absent at or after this.
    expires_at_ms: i64,
}

/// In-memory counter store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCounterStore {
    /// Counter rows keyed by window key, protected by a mutex.
    counters: Arc<Mutex<BTreeMap<WindowKey, CounterRow>>>,
}

impl InMemoryCounterStore {
    /// Creates a new in-memory counter store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment_if_below(
        &self,
        key: &WindowKey,
        limit: u32,
        expires_at_ms: i64,
        now_ms: i64,
    ) -> Result<WindowAdmission, StoreError> {
        let mut guard = self
            .counters
            .lock()
            .map_err(|_| StoreError::Store("counter store mutex poisoned".to_string()))?;
        // The mutex makes the read-check-write indivisible for this backend.
        // Sweep every expired row first, so stale windows are reclaimed on
        // the request path rather than waiting for an explicit purge.
        guard.retain(|_, row| row.expires_at_ms > now_ms);
        let row = guard.entry(key.clone()).or_insert(CounterRow {
            count: 0,
            expires_at_ms,
        });
        let admission = if row.count < limit {
            row.count = row.count.saturating_add(1);
            WindowAdmission::Admitted {
                count: row.count,
            }
        } else {
            WindowAdmission::Refused {
                count: row.count,
            }
        };
        drop(guard);
        Ok(admission)
    }

    fn decrement(&self, key: &WindowKey, now_ms: i64) -> Result<(), StoreError> {
        let mut guard = self
            .counters
            .lock()
            .map_err(|_| StoreError::Store("counter store mutex poisoned".to_string()))?;
        if let Some(row) = guard.get_mut(key)
            && row.expires_at_ms > now_ms
        {
            row.count = row.count.saturating_sub(1);
        }
        drop(guard);
        Ok(())
    }

    fn count(&self, key: &WindowKey, now_ms: i64) -> Result<u32, StoreError> {
        let guard = self
            .counters
            .lock()
            .map_err(|_| StoreError::Store("counter store mutex poisoned".to_string()))?;
        Ok(guard
            .get(key)
            .filter(|row| row.expires_at_ms > now_ms)
            .map_or(0, |row| row.count))
    }

    fn purge_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        let mut guard = self
            .counters
            .lock()
            .map_err(|_| StoreError::Store("counter store mutex poisoned".to_string()))?;
        let before = guard.len();
        guard.retain(|_, row| row.expires_at_ms > now_ms);
        let removed = before - guard.len();
        drop(guard);
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

// ============================================================================
// SECTION: Shared Store Wrappers
// ============================================================================

/// Shared key store backed by an `Arc` trait object.
///
/// Constructed once at process startup and passed into each component; there
/// is no lazily created global handle.
#[derive(Clone)]
pub struct SharedKeyStore {
    /// Inner store implementation.
    inner: Arc<dyn KeyStore>,
}

impl SharedKeyStore {
    /// Wraps a key store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl KeyStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl KeyStore for SharedKeyStore {
    fn insert(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        self.inner.insert(record)
    }

    fn get(&self, key_id: &KeyId) -> Result<Option<CredentialRecord>, StoreError> {
        self.inner.get(key_id)
    }

    fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<CredentialRecord>, StoreError> {
        self.inner.list_by_owner(owner_id)
    }

    fn update(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        self.inner.update(record)
    }

    fn delete(&self, key_id: &KeyId) -> Result<bool, StoreError> {
        self.inner.delete(key_id)
    }

    fn record_usage(
        &self,
        key_id: &KeyId,
        outcome: UsageOutcome,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        self.inner.record_usage(key_id, outcome, now_ms)
    }
}

/// Shared counter store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedCounterStore {
    /// Inner store implementation.
    inner: Arc<dyn CounterStore>,
}

impl SharedCounterStore {
    /// Wraps a counter store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl CounterStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl CounterStore for SharedCounterStore {
    fn increment_if_below(
        &self,
        key: &WindowKey,
        limit: u32,
        expires_at_ms: i64,
        now_ms: i64,
    ) -> Result<WindowAdmission, StoreError> {
        self.inner.increment_if_below(key, limit, expires_at_ms, now_ms)
    }

    fn decrement(&self, key: &WindowKey, now_ms: i64) -> Result<(), StoreError> {
        self.inner.decrement(key, now_ms)
    }

    fn count(&self, key: &WindowKey, now_ms: i64) -> Result<u32, StoreError> {
        self.inner.count(key, now_ms)
    }

    fn purge_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        self.inner.purge_expired(now_ms)
    }
}
