// crates/media-gate-config/src/config.rs
// ============================================================================
// Module: Media Gate Configuration
// Description: Configuration loading and validation for Media Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: media-gate-core, media-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: the process refuses to
//! start rather than run with weakened quota or outage behavior. Unknown
//! fields are rejected so typos cannot silently disable enforcement.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use media_gate_core::OutagePolicy;
use media_gate_core::Permission;
use media_gate_core::RateLimitPolicy;
use media_gate_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "media-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "MEDIA_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum allowed requests in any quota window.
pub(crate) const MAX_RATE_LIMIT_CEILING: u32 = 1_000_000;
/// Maximum number of entries in the permission whitelist.
pub(crate) const MAX_ALLOWED_PERMISSIONS: usize = 32;
/// Default per-minute ceiling for newly issued credentials.
pub(crate) const DEFAULT_PER_MINUTE: u32 = 60;
/// Default per-hour ceiling for newly issued credentials.
pub(crate) const DEFAULT_PER_HOUR: u32 = 1_000;
/// Default per-day ceiling for newly issued credentials.
pub(crate) const DEFAULT_PER_DAY: u32 = 10_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Media Gate configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MediaGateConfig {
    /// Key registry configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Auth gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Store backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl MediaGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        // Refuse oversized files before reading them into memory. The length
        // is re-checked after the read in case the file grew in between.
        let metadata = fs::metadata(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Key registry configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Default quota ceilings applied when a create request omits them.
    #[serde(default)]
    pub default_rate_limit: RateLimitDefaultsConfig,
    /// Permission whitelist for newly issued credentials. Empty means the
    /// full built-in permission set is accepted.
    #[serde(default)]
    pub allowed_permissions: Vec<String>,
}

impl RegistryConfig {
    /// Validates registry configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.default_rate_limit.validate()?;
        if self.allowed_permissions.len() > MAX_ALLOWED_PERMISSIONS {
            return Err(ConfigError::Invalid(
                "registry.allowed_permissions has too many entries".to_string(),
            ));
        }
        for entry in &self.allowed_permissions {
            if Permission::parse(entry).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "unknown permission in registry.allowed_permissions: {entry}"
                )));
            }
        }
        Ok(())
    }

    /// Returns the default quota policy for new credentials.
    #[must_use]
    pub const fn default_rate_limit(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            per_minute: self.default_rate_limit.per_minute,
            per_hour: self.default_rate_limit.per_hour,
            per_day: self.default_rate_limit.per_day,
        }
    }

    /// Returns the effective permission whitelist. An empty configured list
    /// means every built-in permission is grantable.
    #[must_use]
    pub fn allowed_permission_set(&self) -> BTreeSet<Permission> {
        if self.allowed_permissions.is_empty() {
            return media_gate_core::ALL_PERMISSIONS.iter().copied().collect();
        }
        self.allowed_permissions
            .iter()
            .filter_map(|entry| Permission::parse(entry))
            .collect()
    }
}

/// Default quota ceilings for new credentials.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitDefaultsConfig {
    /// Requests admitted per minute window.
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
    /// Requests admitted per hour window.
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,
    /// Requests admitted per day window.
    #[serde(default = "default_per_day")]
    pub per_day: u32,
}

impl Default for RateLimitDefaultsConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
            per_day: default_per_day(),
        }
    }
}

impl RateLimitDefaultsConfig {
    /// Validates quota ceiling defaults.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("registry.default_rate_limit.per_minute", self.per_minute),
            ("registry.default_rate_limit.per_hour", self.per_hour),
            ("registry.default_rate_limit.per_day", self.per_day),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
            }
            if value > MAX_RATE_LIMIT_CEILING {
                return Err(ConfigError::Invalid(format!(
                    "{field} exceeds maximum of {MAX_RATE_LIMIT_CEILING}"
                )));
            }
        }
        Ok(())
    }
}

/// Returns the default per-minute ceiling.
const fn default_per_minute() -> u32 {
    DEFAULT_PER_MINUTE
}

/// Returns the default per-hour ceiling.
const fn default_per_hour() -> u32 {
    DEFAULT_PER_HOUR
}

/// Returns the default per-day ceiling.
const fn default_per_day() -> u32 {
    DEFAULT_PER_DAY
}

/// Auth gateway configuration.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Behavior when the counter store is unavailable.
    #[serde(default)]
    pub outage_policy: OutagePolicyConfig,
}

impl GatewayConfig {
    /// Returns the runtime outage policy.
    #[must_use]
    pub const fn to_outage_policy(&self) -> OutagePolicy {
        match self.outage_policy {
            OutagePolicyConfig::FailClosed => OutagePolicy::FailClosed,
            OutagePolicyConfig::FailOpen => OutagePolicy::FailOpen,
        }
    }
}

/// Outage policy selection for quota enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutagePolicyConfig {
    /// Deny requests when the counter store is unavailable (default).
    #[default]
    FailClosed,
    /// Admit validated requests without quota accounting during an outage.
    FailOpen,
}

/// Store backend configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` settings when using the sqlite backend.
    #[serde(default)]
    pub sqlite: Option<SqliteStoreConfig>,
}

impl StoreConfig {
    /// Validates store backend configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.sqlite.is_some() {
                    return Err(ConfigError::Invalid(
                        "store.sqlite only allowed when store.type=sqlite".to_string(),
                    ));
                }
            }
            StoreType::Sqlite => {
                let Some(sqlite) = &self.sqlite else {
                    return Err(ConfigError::Invalid(
                        "store.type=sqlite requires store.sqlite".to_string(),
                    ));
                };
                validate_store_file_path(&sqlite.path)?;
            }
        }
        Ok(())
    }
}

/// Supported store backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-memory stores; state is lost on restart.
    #[default]
    Memory,
    /// `SQLite`-backed durable stores.
    Sqlite,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
        }
    }
}

/// Returns the default audit enablement.
const fn default_audit_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a store file path against length constraints.
fn validate_store_file_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid("store.sqlite.path must be non-empty".to_string()));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("store.sqlite.path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(
                "store.sqlite.path component too long".to_string(),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = MediaGateConfig::default();
        assert!(config.validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn default_registry_ceilings_are_nonzero() {
        let config = RegistryConfig::default();
        let policy = config.default_rate_limit();
        assert_eq!(policy.per_minute, DEFAULT_PER_MINUTE);
        assert_eq!(policy.per_hour, DEFAULT_PER_HOUR);
        assert_eq!(policy.per_day, DEFAULT_PER_DAY);
    }

    #[test]
    fn empty_whitelist_grants_all_builtin_permissions() {
        let config = RegistryConfig::default();
        let set = config.allowed_permission_set();
        assert_eq!(set.len(), media_gate_core::ALL_PERMISSIONS.len());
    }

    #[test]
    fn explicit_whitelist_is_restrictive() {
        let config = RegistryConfig {
            allowed_permissions: vec!["media:read".to_string()],
            ..RegistryConfig::default()
        };
        let set = config.allowed_permission_set();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&Permission::MediaRead));
    }

    #[test]
    fn unknown_permission_fails_validation() {
        let config = RegistryConfig {
            allowed_permissions: vec!["media:transcode".to_string()],
            ..RegistryConfig::default()
        };
        assert!(config.validate().is_err(), "unknown permission should fail");
    }

    #[test]
    fn zero_ceiling_fails_validation() {
        let defaults = RateLimitDefaultsConfig {
            per_minute: 0,
            ..RateLimitDefaultsConfig::default()
        };
        assert!(defaults.validate().is_err(), "zero ceiling should fail");
    }

    #[test]
    fn oversized_ceiling_fails_validation() {
        let defaults = RateLimitDefaultsConfig {
            per_day: MAX_RATE_LIMIT_CEILING + 1,
            ..RateLimitDefaultsConfig::default()
        };
        assert!(defaults.validate().is_err(), "oversized ceiling should fail");
    }

    #[test]
    fn outage_policy_defaults_to_fail_closed() {
        let config = GatewayConfig::default();
        assert_eq!(config.to_outage_policy(), OutagePolicy::FailClosed);
    }

    #[test]
    fn sqlite_type_requires_sqlite_section() {
        let config = StoreConfig {
            store_type: StoreType::Sqlite,
            sqlite: None,
        };
        let result = config.validate();
        assert!(result.is_err(), "sqlite backend without settings should fail");
        assert!(result.unwrap_err().to_string().contains("store.sqlite"));
    }

    #[test]
    fn memory_type_rejects_sqlite_section() {
        let config = StoreConfig {
            store_type: StoreType::Memory,
            sqlite: Some(SqliteStoreConfig {
                path: PathBuf::from("./gate.db"),
                busy_timeout_ms: 1_000,
                journal_mode: media_gate_store_sqlite::SqliteStoreMode::Wal,
                sync_mode: media_gate_store_sqlite::SqliteSyncMode::Full,
            }),
        };
        assert!(config.validate().is_err(), "memory backend with sqlite settings should fail");
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let result: Result<MediaGateConfig, _> = toml::from_str("[registry]\nrate_cap = 5\n");
        assert!(result.is_err(), "unknown field should be rejected");
    }

    #[test]
    fn parse_full_document() {
        let document = r#"
            [registry]
            allowed_permissions = ["media:read", "media:analyze"]

            [registry.default_rate_limit]
            per_minute = 5
            per_hour = 100
            per_day = 500

            [gateway]
            outage_policy = "fail_open"

            [store]
            type = "sqlite"

            [store.sqlite]
            path = "./data/gate.db"

            [audit]
            enabled = false
        "#;
        let config: MediaGateConfig = toml::from_str(document).unwrap();
        config.validate().unwrap();
        assert_eq!(config.registry.default_rate_limit.per_minute, 5);
        assert_eq!(config.gateway.to_outage_policy(), OutagePolicy::FailOpen);
        assert_eq!(config.store.store_type, StoreType::Sqlite);
        assert!(!config.audit.enabled);
        let permissions = config.registry.allowed_permission_set();
        assert!(permissions.contains(&Permission::MediaAnalyze));
        assert!(!permissions.contains(&Permission::MediaDelete));
    }

    #[test]
    fn config_path_length_limit_enforced() {
        let long = PathBuf::from("a".repeat(MAX_TOTAL_PATH_LENGTH + 1));
        assert!(validate_path(&long).is_err(), "overlong path should fail");
    }
}
