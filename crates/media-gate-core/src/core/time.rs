// crates/media-gate-core/src/core/time.rs
// ============================================================================
// Module: Media Gate Time Model
// Description: Fixed-window math over unix-millisecond timestamps.
// Purpose: Provide deterministic window boundaries for quota accounting.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Quota windows are fixed buckets (minute, hour, day) in UTC. All window
//! math operates on unix epoch milliseconds, which truncate to UTC boundaries
//! by construction. Runtime components never read wall-clock time directly;
//! hosts inject a [`Clock`] at startup so tests can drive time explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Milliseconds per minute window.
const MINUTE_MS: i64 = 60 * 1_000;
/// Milliseconds per hour window.
const HOUR_MS: i64 = 60 * MINUTE_MS;
/// Milliseconds per day window.
const DAY_MS: i64 = 24 * HOUR_MS;

// ============================================================================
// SECTION: Granularity
// ============================================================================

/// Window granularity for quota counters.
///
/// # Invariants
/// - Labels are stable; they form part of durable counter keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One-minute window.
    Minute,
    /// One-hour window.
    Hour,
    /// One-day (UTC) window.
    Day,
}

/// Granularities ordered smallest to largest, the order the limiter
/// increments them.
pub const GRANULARITIES_ASCENDING: [Granularity; 3] =
    [Granularity::Minute, Granularity::Hour, Granularity::Day];

impl Granularity {
    /// Returns the window duration in milliseconds.
    #[must_use]
    pub const fn duration_ms(self) -> i64 {
        match self {
            Self::Minute => MINUTE_MS,
            Self::Hour => HOUR_MS,
            Self::Day => DAY_MS,
        }
    }

    /// Returns the stable label used in counter keys and audit events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Parses a stable granularity label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            _ => None,
        }
    }

    /// Returns the start of the window containing `now_ms`, truncated down
    /// to the granularity boundary in UTC.
    #[must_use]
    pub const fn window_start_ms(self, now_ms: i64) -> i64 {
        let duration = self.duration_ms();
        now_ms.div_euclid(duration) * duration
    }

    /// Returns the remaining time in the window containing `now_ms`.
    ///
    /// The result is always positive while `now_ms` lies inside the window.
    #[must_use]
    pub const fn remaining_ms(self, now_ms: i64) -> i64 {
        self.window_start_ms(now_ms) + self.duration_ms() - now_ms
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Wall-clock abstraction injected into runtime components.
pub trait Clock: Send + Sync {
    /// Returns the current unix epoch time in milliseconds.
    fn now_ms(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Fixed clock for tests and deterministic replay.
#[derive(Debug)]
pub struct FixedClock {
    /// Time value returned by every `now_ms` call.
    now_ms: std::sync::atomic::AtomicI64,
}

impl FixedClock {
    /// Creates a fixed clock pinned at the provided time.
    #[must_use]
    pub const fn new(now_ms: i64) -> Self {
        Self {
            now_ms: std::sync::atomic::AtomicI64::new(now_ms),
        }
    }

    /// Advances the clock to the provided time.
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(std::sync::atomic::Ordering::SeqCst)
    }
}
