// crates/media-gate-core/src/core/mod.rs
// ============================================================================
// Module: Media Gate Core Types
// Description: Canonical credential, permission, and time-window structures.
// Purpose: Provide stable, serializable types for Media Gate records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Media Gate core types define credentials, capability permissions, quota
//! windows, and secret-handling primitives. These types are the canonical
//! source of truth for any derived API surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod credential;
pub mod hashing;
pub mod identifiers;
pub mod permissions;
pub mod time;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credential::CallerIdentity;
pub use credential::CallerRole;
pub use credential::Credential;
pub use credential::CredentialPatch;
pub use credential::CredentialRecord;
pub use credential::RateLimitPolicy;
pub use credential::UsageStats;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::hash_bytes;
pub use identifiers::KeyId;
pub use identifiers::OwnerId;
pub use permissions::ALL_PERMISSIONS;
pub use permissions::Permission;
pub use permissions::UnknownPermission;
pub use time::Clock;
pub use time::FixedClock;
pub use time::GRANULARITIES_ASCENDING;
pub use time::Granularity;
pub use time::SystemClock;
pub use token::KEY_ID_PREFIX;
pub use token::MAX_TOKEN_BYTES;
pub use token::PresentedToken;
pub use token::TOKEN_SEPARATOR;
pub use token::compose_token;
pub use token::constant_time_eq;
pub use token::generate_key_id;
pub use token::generate_secret;
pub use token::hash_secret;
pub use token::parse_token;
pub use token::secret_matches;
