// crates/media-gate-core/src/core/permissions.rs
// ============================================================================
// Module: Media Gate Permissions
// Description: Closed capability enumeration for media-analysis endpoints.
// Purpose: Reject unknown capability strings at the registry boundary.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Capabilities are a closed enumeration rather than free-form strings.
//! Parsing fails on unknown values, so a credential can never be issued with
//! a capability the gateway does not understand.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Permission
// ============================================================================

/// Capability granted to a credential.
///
/// # Invariants
/// - String forms are stable; they appear in configs and stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    /// Read media metadata and analysis results.
    MediaRead,
    /// Upload or replace media objects.
    MediaWrite,
    /// Run analysis jobs against media objects.
    MediaAnalyze,
    /// Delete media objects.
    MediaDelete,
    /// Read usage statistics for owned credentials.
    UsageRead,
}

/// All permissions in canonical order.
pub const ALL_PERMISSIONS: [Permission; 5] = [
    Permission::MediaRead,
    Permission::MediaWrite,
    Permission::MediaAnalyze,
    Permission::MediaDelete,
    Permission::UsageRead,
];

impl Permission {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MediaRead => "media:read",
            Self::MediaWrite => "media:write",
            Self::MediaAnalyze => "media:analyze",
            Self::MediaDelete => "media:delete",
            Self::UsageRead => "usage:read",
        }
    }

    /// Parses a canonical permission string.
    ///
    /// Returns `None` for unknown values; callers decide how to surface the
    /// rejection.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "media:read" => Some(Self::MediaRead),
            "media:write" => Some(Self::MediaWrite),
            "media:analyze" => Some(Self::MediaAnalyze),
            "media:delete" => Some(Self::MediaDelete),
            "usage:read" => Some(Self::UsageRead),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a capability string is not recognized.
#[derive(Debug, Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| UnknownPermission(value.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = UnknownPermission;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.as_str().to_string()
    }
}
