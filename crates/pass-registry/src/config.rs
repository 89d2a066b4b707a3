//! Registry configuration from defaults, environment variables or a JSON file.

use crate::domain::registry::{DEFAULT_NAME, DEFAULT_SYMBOL};
use crate::domain::value_objects::Address;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Default supply cap.
pub const DEFAULT_MAX_SUPPLY: u64 = 1000;

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Construction-time parameters of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Collection name.
    pub name: String,
    /// Collection symbol.
    pub symbol: String,
    /// Immutable supply cap.
    pub max_supply: u64,
    /// Initial metadata base path.
    pub base_uri: String,
    /// Administrator principal. MUST be set before use.
    pub admin: Address,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            max_supply: DEFAULT_MAX_SUPPLY,
            base_uri: String::new(),
            admin: Address::ZERO, // MUST be overridden
        }
    }
}

impl RegistryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `REVPASS_NAME`: Collection name (default: RevPass)
    /// - `REVPASS_SYMBOL`: Collection symbol (default: REV)
    /// - `REVPASS_MAX_SUPPLY`: Supply cap (default: 1000)
    /// - `REVPASS_BASE_URI`: Metadata base path (default: empty)
    /// - `REVPASS_ADMIN`: Admin address, hex (no default)
    ///
    /// # Errors
    ///
    /// `InvalidVar` if a numeric or address variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Applies environment overrides on top of `self`.
    ///
    /// # Errors
    ///
    /// `InvalidVar` if a numeric or address variable does not parse.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(name) = env::var("REVPASS_NAME") {
            self.name = name;
        }
        if let Ok(symbol) = env::var("REVPASS_SYMBOL") {
            self.symbol = symbol;
        }
        if let Ok(raw) = env::var("REVPASS_MAX_SUPPLY") {
            self.max_supply = raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidVar {
                    var: "REVPASS_MAX_SUPPLY",
                    reason: e.to_string(),
                }
            })?;
        }
        if let Ok(base_uri) = env::var("REVPASS_BASE_URI") {
            self.base_uri = base_uri;
        }
        if let Ok(raw) = env::var("REVPASS_ADMIN") {
            self.admin = raw.parse().map_err(|e: crate::domain::AddressParseError| {
                ConfigError::InvalidVar {
                    var: "REVPASS_ADMIN",
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(self)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// `File` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parse configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// `File` if the document is malformed.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::File(e.to_string()))
    }

    /// Validate configuration before building a registry.
    ///
    /// # Errors
    ///
    /// `ZeroAdmin` if no admin was configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.is_zero() {
            return Err(ConfigError::ZeroAdmin);
        }
        Ok(())
    }
}

/// Pass registry service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Registry construction parameters.
    pub registry: RegistryConfig,
    /// Broadcast buffer for registry events.
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ServiceConfig {
    /// Service config wrapping a registry config.
    #[must_use]
    pub fn new(registry: RegistryConfig) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }
}
