// crates/media-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Media Gate SQLite Store Library
// Description: Durable SQLite backend for the Key Store and Counter Store.
// Purpose: Expose the shared store handle and its configuration surface.
// Dependencies: crate::{counters, keys, store}
// ============================================================================

//! ## Overview
//! `SQLite`-backed persistence for Media Gate. One [`SqliteGateStore`]
//! handle implements both store interfaces over a single serialized
//! connection, giving atomic conditional writes without external
//! coordination. Open the store once at startup and clone the handle into
//! each component.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod counters;
mod keys;
mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteGateStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
