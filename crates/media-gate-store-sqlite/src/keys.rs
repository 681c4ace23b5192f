// crates/media-gate-store-sqlite/src/keys.rs
// ============================================================================
// Module: SQLite Key Store
// Description: Durable credential records over the shared SQLite handle.
// Purpose: Conditional create, owner-indexed lookup, and atomic usage stats.
// Dependencies: media-gate-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Credential records live in the `credentials` table keyed by `key_id`,
//! with a secondary index on `owner_id`. The insert is conditional (the
//! primary key refuses duplicates atomically) and the usage-stats update is
//! a single `UPDATE` statement, so no operation exposes a read-modify-write
//! window to concurrent workers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use media_gate_core::CredentialRecord;
use media_gate_core::HashAlgorithm;
use media_gate_core::HashDigest;
use media_gate_core::KeyId;
use media_gate_core::KeyStore;
use media_gate_core::OwnerId;
use media_gate_core::Permission;
use media_gate_core::RateLimitPolicy;
use media_gate_core::StoreError;
use media_gate_core::UsageOutcome;
use media_gate_core::UsageStats;
use rusqlite::Row;
use rusqlite::params;

use crate::store::SqliteGateStore;
use crate::store::SqliteStoreError;
use crate::store::map_db_error;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by every credential query.
const CREDENTIAL_COLUMNS: &str = "key_id, owner_id, name, description, permissions, per_minute, \
                                  per_hour, per_day, is_active, expires_at_ms, secret_hash, \
                                  hash_algorithm, created_at_ms, updated_at_ms, last_used_at_ms, \
                                  total_requests, successful_requests, failed_requests, \
                                  last_request_at_ms";

/// Raw credential row as read from `SQLite`, before semantic validation.
struct CredentialRow {
    /// Credential identifier.
    key_id: String,
    /// Owning principal.
    owner_id: String,
    /// Display name.
    name: String,
    /// Optional description.
    description: Option<String>,
    /// Permissions as a JSON array of canonical strings.
    permissions: String,
    /// Minute ceiling.
    per_minute: i64,
    /// Hour ceiling.
    per_hour: i64,
    /// Day ceiling.
    per_day: i64,
    /// Active flag (0/1).
    is_active: i64,
    /// Optional expiry.
    expires_at_ms: Option<i64>,
    /// Hex secret digest.
    secret_hash: String,
    /// Digest algorithm label.
    hash_algorithm: String,
    /// Creation time.
    created_at_ms: i64,
    /// Last mutation time.
    updated_at_ms: i64,
    /// Last validation time.
    last_used_at_ms: Option<i64>,
    /// Lifetime request total.
    total_requests: i64,
    /// Lifetime successful requests.
    successful_requests: i64,
    /// Lifetime failed requests.
    failed_requests: i64,
    /// Last recorded request time.
    last_request_at_ms: Option<i64>,
}

/// Reads a raw credential row.
fn read_row(row: &Row<'_>) -> Result<CredentialRow, rusqlite::Error> {
    Ok(CredentialRow {
        key_id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        permissions: row.get(4)?,
        per_minute: row.get(5)?,
        per_hour: row.get(6)?,
        per_day: row.get(7)?,
        is_active: row.get(8)?,
        expires_at_ms: row.get(9)?,
        secret_hash: row.get(10)?,
        hash_algorithm: row.get(11)?,
        created_at_ms: row.get(12)?,
        updated_at_ms: row.get(13)?,
        last_used_at_ms: row.get(14)?,
        total_requests: row.get(15)?,
        successful_requests: row.get(16)?,
        failed_requests: row.get(17)?,
        last_request_at_ms: row.get(18)?,
    })
}

/// Converts a raw row into a validated credential record.
fn into_record(row: CredentialRow) -> Result<CredentialRecord, SqliteStoreError> {
    let permissions: BTreeSet<Permission> = serde_json::from_str(&row.permissions)
        .map_err(|err| SqliteStoreError::Invalid(format!("invalid permissions column: {err}")))?;
    let algorithm = HashAlgorithm::parse(&row.hash_algorithm).ok_or_else(|| {
        SqliteStoreError::Invalid(format!("unsupported hash algorithm: {}", row.hash_algorithm))
    })?;
    Ok(CredentialRecord {
        key_id: KeyId::new(row.key_id),
        secret_hash: HashDigest {
            algorithm,
            value: row.secret_hash,
        },
        owner_id: OwnerId::new(row.owner_id),
        name: row.name,
        description: row.description,
        permissions,
        rate_limit: RateLimitPolicy {
            per_minute: column_u32(row.per_minute, "per_minute")?,
            per_hour: column_u32(row.per_hour, "per_hour")?,
            per_day: column_u32(row.per_day, "per_day")?,
        },
        is_active: row.is_active != 0,
        expires_at_ms: row.expires_at_ms,
        created_at_ms: row.created_at_ms,
        updated_at_ms: row.updated_at_ms,
        last_used_at_ms: row.last_used_at_ms,
        usage_stats: UsageStats {
            total_requests: column_u64(row.total_requests, "total_requests")?,
            successful_requests: column_u64(row.successful_requests, "successful_requests")?,
            failed_requests: column_u64(row.failed_requests, "failed_requests")?,
            last_request_at_ms: row.last_request_at_ms,
        },
    })
}

/// Converts a non-negative integer column to `u32`.
fn column_u32(value: i64, column: &str) -> Result<u32, SqliteStoreError> {
    u32::try_from(value)
        .map_err(|_| SqliteStoreError::Invalid(format!("column {column} out of range: {value}")))
}

/// Converts a non-negative integer column to `u64`.
fn column_u64(value: i64, column: &str) -> Result<u64, SqliteStoreError> {
    u64::try_from(value)
        .map_err(|_| SqliteStoreError::Invalid(format!("column {column} out of range: {value}")))
}

/// Serializes a permission set as a JSON array of canonical strings.
fn permissions_json(permissions: &BTreeSet<Permission>) -> Result<String, SqliteStoreError> {
    serde_json::to_string(permissions)
        .map_err(|err| SqliteStoreError::Invalid(format!("permissions not serializable: {err}")))
}

// ============================================================================
// SECTION: Key Store Impl
// ============================================================================

impl SqliteGateStore {
    /// Loads a credential record inside the shared connection.
    fn get_record(&self, key_id: &KeyId) -> Result<Option<CredentialRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE key_id = ?1"),
                params![key_id.as_str()],
                read_row,
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_db_error(&other)),
            })?;
        drop(guard);
        row.map(into_record).transpose()
    }
}

impl KeyStore for SqliteGateStore {
    fn insert(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let permissions = permissions_json(&record.permissions).map_err(StoreError::from)?;
        let guard = self.lock().map_err(StoreError::from)?;
        guard
            .execute(
                "INSERT INTO credentials (key_id, owner_id, name, description, permissions, \
                 per_minute, per_hour, per_day, is_active, expires_at_ms, secret_hash, \
                 hash_algorithm, created_at_ms, updated_at_ms, last_used_at_ms, total_requests, \
                 successful_requests, failed_requests, last_request_at_ms) VALUES (?1, ?2, ?3, \
                 ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                params![
                    record.key_id.as_str(),
                    record.owner_id.as_str(),
                    record.name,
                    record.description,
                    permissions,
                    i64::from(record.rate_limit.per_minute),
                    i64::from(record.rate_limit.per_hour),
                    i64::from(record.rate_limit.per_day),
                    i64::from(record.is_active),
                    record.expires_at_ms,
                    record.secret_hash.value,
                    record.secret_hash.algorithm.label(),
                    record.created_at_ms,
                    record.updated_at_ms,
                    record.last_used_at_ms,
                    i64::try_from(record.usage_stats.total_requests).unwrap_or(i64::MAX),
                    i64::try_from(record.usage_stats.successful_requests).unwrap_or(i64::MAX),
                    i64::try_from(record.usage_stats.failed_requests).unwrap_or(i64::MAX),
                    record.usage_stats.last_request_at_ms,
                ],
            )
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        drop(guard);
        Ok(())
    }

    fn get(&self, key_id: &KeyId) -> Result<Option<CredentialRecord>, StoreError> {
        self.get_record(key_id).map_err(StoreError::from)
    }

    fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<CredentialRecord>, StoreError> {
        let rows = {
            let guard = self.lock().map_err(StoreError::from)?;
            let mut statement = guard
                .prepare(&format!(
                    "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE owner_id = ?1 ORDER BY \
                     key_id"
                ))
                .map_err(|err| StoreError::from(map_db_error(&err)))?;
            let mapped = statement
                .query_map(params![owner_id.as_str()], read_row)
                .map_err(|err| StoreError::from(map_db_error(&err)))?
                .collect::<Result<Vec<CredentialRow>, rusqlite::Error>>()
                .map_err(|err| StoreError::from(map_db_error(&err)))?;
            drop(statement);
            drop(guard);
            mapped
        };
        rows.into_iter()
            .map(|row| into_record(row).map_err(StoreError::from))
            .collect()
    }

    fn update(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let permissions = permissions_json(&record.permissions).map_err(StoreError::from)?;
        let guard = self.lock().map_err(StoreError::from)?;
        let changed = guard
            .execute(
                "UPDATE credentials SET name = ?2, description = ?3, permissions = ?4, \
                 per_minute = ?5, per_hour = ?6, per_day = ?7, is_active = ?8, updated_at_ms = \
                 ?9 WHERE key_id = ?1",
                params![
                    record.key_id.as_str(),
                    record.name,
                    record.description,
                    permissions,
                    i64::from(record.rate_limit.per_minute),
                    i64::from(record.rate_limit.per_hour),
                    i64::from(record.rate_limit.per_day),
                    i64::from(record.is_active),
                    record.updated_at_ms,
                ],
            )
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        drop(guard);
        if changed == 0 {
            return Err(StoreError::Invalid(format!(
                "credential does not exist: {}",
                record.key_id
            )));
        }
        Ok(())
    }

    fn delete(&self, key_id: &KeyId) -> Result<bool, StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        let changed = guard
            .execute("DELETE FROM credentials WHERE key_id = ?1", params![key_id.as_str()])
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        drop(guard);
        Ok(changed > 0)
    }

    fn record_usage(
        &self,
        key_id: &KeyId,
        outcome: UsageOutcome,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let (success_delta, failure_delta) = match outcome {
            UsageOutcome::Success => (1_i64, 0_i64),
            UsageOutcome::Failure => (0_i64, 1_i64),
        };
        let guard = self.lock().map_err(StoreError::from)?;
        // Single conditional statement; missing rows are an acceptable no-op
        // because the credential may have been deleted after the decision.
        guard
            .execute(
                "UPDATE credentials SET total_requests = total_requests + 1, \
                 successful_requests = successful_requests + ?2, failed_requests = \
                 failed_requests + ?3, last_used_at_ms = ?4, last_request_at_ms = ?4 WHERE \
                 key_id = ?1",
                params![key_id.as_str(), success_delta, failure_delta, now_ms],
            )
            .map_err(|err| StoreError::from(map_db_error(&err)))?;
        drop(guard);
        Ok(())
    }
}
