// crates/media-gate-core/src/lib.rs
// ============================================================================
// Module: Media Gate Core Library
// Description: Public API surface for the Media Gate core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Media Gate core provides credential issuance, per-request validation,
//! multi-window quota enforcement, and usage tracking for a media-analysis
//! API. It is backend-agnostic and integrates through explicit store
//! interfaces rather than embedding into any HTTP or identity framework.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::ALL_PERMISSIONS;
pub use self::core::CallerIdentity;
pub use self::core::CallerRole;
pub use self::core::Clock;
pub use self::core::Credential;
pub use self::core::CredentialPatch;
pub use self::core::CredentialRecord;
pub use self::core::DEFAULT_HASH_ALGORITHM;
pub use self::core::FixedClock;
pub use self::core::GRANULARITIES_ASCENDING;
pub use self::core::Granularity;
pub use self::core::HashAlgorithm;
pub use self::core::HashDigest;
pub use self::core::KEY_ID_PREFIX;
pub use self::core::KeyId;
pub use self::core::MAX_TOKEN_BYTES;
pub use self::core::OwnerId;
pub use self::core::Permission;
pub use self::core::PresentedToken;
pub use self::core::RateLimitPolicy;
pub use self::core::SystemClock;
pub use self::core::TOKEN_SEPARATOR;
pub use self::core::UnknownPermission;
pub use self::core::UsageStats;
pub use self::core::compose_token;
pub use self::core::constant_time_eq;
pub use self::core::generate_key_id;
pub use self::core::generate_secret;
pub use self::core::hash_bytes;
pub use self::core::hash_secret;
pub use self::core::parse_token;
pub use self::core::secret_matches;
pub use interfaces::CounterStore;
pub use interfaces::GateAuditEvent;
pub use interfaces::GateAuditSink;
pub use interfaces::KeyStore;
pub use interfaces::NoopAuditSink;
pub use interfaces::StderrAuditSink;
pub use interfaces::StoreError;
pub use interfaces::UsageOutcome;
pub use interfaces::WindowAdmission;
pub use interfaces::WindowKey;
pub use runtime::AccessDecision;
pub use runtime::AuthGateway;
pub use runtime::CreateKeyRequest;
pub use runtime::CredentialValidator;
pub use runtime::DeniedReason;
pub use runtime::FailedValidation;
pub use runtime::InMemoryCounterStore;
pub use runtime::InMemoryKeyStore;
pub use runtime::IssuedCredential;
pub use runtime::KeyRegistry;
pub use runtime::OutagePolicy;
pub use runtime::RateLimitDecision;
pub use runtime::RateLimitError;
pub use runtime::RateLimitRejection;
pub use runtime::RateLimiter;
pub use runtime::RegistryError;
pub use runtime::SharedCounterStore;
pub use runtime::SharedKeyStore;
pub use runtime::UsageRecorder;
pub use runtime::ValidatedCredential;
pub use runtime::ValidationFailure;
pub use runtime::WINDOW_EXPIRY_MARGIN_MS;
