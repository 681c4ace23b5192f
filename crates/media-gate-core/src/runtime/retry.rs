// crates/media-gate-core/src/runtime/retry.rs
// ============================================================================
// Module: Media Gate Transient Retry
// Description: Bounded retry helper for transient store failures.
// Purpose: Retry infrastructure errors only, never logical failures.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Store calls carry a small, fixed number of retries for transient
//! unavailability (network or throughput throttling). Logical failures such
//! as conflicts or invalid data are returned immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum additional attempts after the first failure.
pub const MAX_TRANSIENT_RETRIES: u32 = 2;

// ============================================================================
// SECTION: Retry Helper
// ============================================================================

/// Runs a store operation, retrying transient failures up to
/// [`MAX_TRANSIENT_RETRIES`] times.
///
/// # Errors
///
/// Returns the last [`StoreError`] once retries are exhausted, or the first
/// non-transient error immediately.
pub fn with_transient_retries<T>(
    mut operation: impl FnMut() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < MAX_TRANSIENT_RETRIES => {
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
