// crates/media-gate-store-sqlite/src/counters.rs
// ============================================================================
// Module: SQLite Counter Store
// Description: Windowed usage counters with atomic conditional increments.
// Purpose: Enforce quota ceilings without read-modify-write races.
// Dependencies: media-gate-core, rusqlite
// ============================================================================

//! ## Overview
//! Each quota window is one row in `usage_windows`, keyed by credential,
//! granularity, and window start. The increment is a single conditional
//! `UPDATE` guarded by `count < limit`, executed inside a transaction on
//! the serialized connection, so concurrent callers can never push a
//! counter past its ceiling. Every increment first sweeps expired rows,
//! so stale windows are reclaimed on the request path; `purge_expired`
//! remains for idle databases.

// ============================================================================
// SECTION: Imports
// ============================================================================

use media_gate_core::CounterStore;
use media_gate_core::StoreError;
use media_gate_core::WindowAdmission;
use media_gate_core::WindowKey;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteGateStore;
use crate::store::SqliteStoreError;
use crate::store::map_db_error;

// ============================================================================
// SECTION: Counter Store Impl
// ============================================================================

impl CounterStore for SqliteGateStore {
    fn increment_if_below(
        &self,
        key: &WindowKey,
        limit: u32,
        expires_at_ms: i64,
        now_ms: i64,
    ) -> Result<WindowAdmission, StoreError> {
        let mut guard = self.lock().map_err(StoreError::from)?;
        let tx = guard
            .transaction()
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        // Rows from earlier window cycles read as absent; sweep every
        // expired row here so stale counters never outlive their window by
        // more than one increment on any credential.
        tx.execute(
            "DELETE FROM usage_windows WHERE expires_at_ms <= ?1",
            params![now_ms],
        )
        .map_err(|err| StoreError::from(map_db_error(&err)))?;
        tx.execute(
            "INSERT INTO usage_windows (key_id, granularity, window_start_ms, count, \
             expires_at_ms) VALUES (?1, ?2, ?3, 0, ?4) ON CONFLICT (key_id, granularity, \
             window_start_ms) DO NOTHING",
            params![
                key.key_id.as_str(),
                key.granularity.label(),
                key.window_start_ms,
                expires_at_ms
            ],
        )
        .map_err(|err| StoreError::from(map_db_error(&err)))?;
        let applied = tx
            .execute(
                "UPDATE usage_windows SET count = count + 1 WHERE key_id = ?1 AND granularity = \
                 ?2 AND window_start_ms = ?3 AND count < ?4",
                params![
                    key.key_id.as_str(),
                    key.granularity.label(),
                    key.window_start_ms,
                    i64::from(limit)
                ],
            )
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        let count: i64 = tx
            .query_row(
                "SELECT count FROM usage_windows WHERE key_id = ?1 AND granularity = ?2 AND \
                 window_start_ms = ?3",
                params![key.key_id.as_str(), key.granularity.label(), key.window_start_ms],
                |row| row.get(0),
            )
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        tx.commit().map_err(|err| StoreError::from(map_db_error(&err)))?;
        drop(guard);
        let count = u32::try_from(count).map_err(|_| {
            StoreError::from(SqliteStoreError::Invalid(format!(
                "counter out of range: {count}"
            )))
        })?;
        if applied > 0 {
            Ok(WindowAdmission::Admitted { count })
        } else {
            Ok(WindowAdmission::Refused { count })
        }
    }

    fn decrement(&self, key: &WindowKey, now_ms: i64) -> Result<(), StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        guard
            .execute(
                "UPDATE usage_windows SET count = count - 1 WHERE key_id = ?1 AND granularity = \
                 ?2 AND window_start_ms = ?3 AND count > 0 AND expires_at_ms > ?4",
                params![key.key_id.as_str(), key.granularity.label(), key.window_start_ms, now_ms],
            )
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        drop(guard);
        Ok(())
    }

    fn count(&self, key: &WindowKey, now_ms: i64) -> Result<u32, StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        let count: Option<i64> = guard
            .query_row(
                "SELECT count FROM usage_windows WHERE key_id = ?1 AND granularity = ?2 AND \
                 window_start_ms = ?3 AND expires_at_ms > ?4",
                params![key.key_id.as_str(), key.granularity.label(), key.window_start_ms, now_ms],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        drop(guard);
        let count = count.unwrap_or(0);
        u32::try_from(count).map_err(|_| {
            StoreError::from(SqliteStoreError::Invalid(format!(
                "counter out of range: {count}"
            )))
        })
    }

    fn purge_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        let removed = guard
            .execute("DELETE FROM usage_windows WHERE expires_at_ms <= ?1", params![now_ms])
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        drop(guard);
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}
