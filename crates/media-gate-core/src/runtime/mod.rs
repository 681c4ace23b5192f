// crates/media-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Media Gate Runtime
// Description: Registry, validator, limiter, recorder, and gateway.
// Purpose: Execute credential lifecycle and per-request authorization.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the credential lifecycle and the per-request
//! decision pipeline. All external surfaces must call into the same gateway
//! logic so every request receives identical treatment.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod gateway;
pub mod limiter;
pub mod recorder;
pub mod registry;
pub mod retry;
pub mod store;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use gateway::AccessDecision;
pub use gateway::AuthGateway;
pub use gateway::DeniedReason;
pub use gateway::OutagePolicy;
pub use limiter::RateLimitDecision;
pub use limiter::RateLimitError;
pub use limiter::RateLimitRejection;
pub use limiter::RateLimiter;
pub use limiter::WINDOW_EXPIRY_MARGIN_MS;
pub use recorder::UsageRecorder;
pub use registry::CreateKeyRequest;
pub use registry::IssuedCredential;
pub use registry::KeyRegistry;
pub use registry::RegistryError;
pub use retry::MAX_TRANSIENT_RETRIES;
pub use retry::with_transient_retries;
pub use store::InMemoryCounterStore;
pub use store::InMemoryKeyStore;
pub use store::SharedCounterStore;
pub use store::SharedKeyStore;
pub use validator::CredentialValidator;
pub use validator::FailedValidation;
pub use validator::ValidatedCredential;
pub use validator::ValidationFailure;
