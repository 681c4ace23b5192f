// crates/media-gate-config/src/lib.rs
// ============================================================================
// Module: Media Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for media-gate.toml semantics.
// Dependencies: media-gate-core, media-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `media-gate-config` defines the canonical configuration model for Media
//! Gate: registry issuance defaults, gateway outage policy, store backend
//! selection, and audit enablement. Validation is strict and fail-closed;
//! an invalid document is refused rather than partially applied.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
