// crates/media-gate-core/src/runtime/recorder.rs
// ============================================================================
// Module: Media Gate Usage Recorder
// Description: Advisory lifetime usage-stat updates after each decision.
// Purpose: Track per-credential usage without ever failing a request.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! After each validation outcome the recorder adjusts the credential's
//! lifetime counters through the Key Store's atomic usage update. The update
//! is advisory: failures are audit-logged and swallowed, and the counters
//! may lag under store pressure. Quota correctness depends solely on the
//! rate limiter's windowed counters, never on these stats.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::KeyId;
use crate::interfaces::GateAuditEvent;
use crate::interfaces::GateAuditSink;
use crate::interfaces::KeyStore;
use crate::interfaces::UsageOutcome;
use crate::runtime::store::SharedKeyStore;

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Best-effort usage recorder backed by the Key Store.
pub struct UsageRecorder {
    /// Durable credential storage.
    keys: SharedKeyStore,
    /// Audit sink for swallowed failures.
    audit: Arc<dyn GateAuditSink>,
}

impl UsageRecorder {
    /// Builds a recorder over the shared key store.
    #[must_use]
    pub fn new(keys: SharedKeyStore, audit: Arc<dyn GateAuditSink>) -> Self {
        Self {
            keys,
            audit,
        }
    }

    /// Records one validation outcome against the credential's stats.
    ///
    /// Never returns an error: store failures are logged through the audit
    /// sink and dropped so a failed advisory update cannot fail the request.
    pub fn record(&self, key_id: &KeyId, outcome: UsageOutcome, now_ms: i64) {
        if let Err(error) = self.keys.record_usage(key_id, outcome, now_ms) {
            self.audit.record(&GateAuditEvent::usage_record_failed(key_id, error.to_string()));
        }
    }
}
