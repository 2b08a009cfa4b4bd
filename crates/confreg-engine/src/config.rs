//! # Engine Configuration
//!
//! Database location, civil time zone, and logging settings.
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Configuration Priority                                │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CONFREG_DATABASE_PATH, CONFREG_CIVIL_ZONE, CONFREG_LOG, ...        │
//! │                                                                         │
//! │  2. Config File                                                        │
//! │     ~/.config/confreg/engine.toml (Linux)                              │
//! │     ~/Library/Application Support/org.confreg.confreg/engine.toml      │
//! │                                                                         │
//! │  3. Defaults (lowest priority)                                         │
//! │     ./confreg.db, America/New_York, epsilon 1 cent                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The civil zone fixes where every tier and breakfast boundary falls, so
//! changing it shifts the hour at which "ends 2025-12-11" stops matching.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use confreg_core::{CivilZone, Money, DEFAULT_CIVIL_ZONE};
use confreg_db::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid engine configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Database Settings
// =============================================================================

/// Where registrations live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./confreg.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Date-boundary and reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    /// IANA zone used for all tier and breakfast boundaries.
    #[serde(default = "default_civil_zone")]
    pub civil_zone: String,

    /// Rounding tolerance, in cents, for `paid + pending <= total`.
    #[serde(default = "default_epsilon")]
    pub inconsistency_epsilon_cents: i64,
}

fn default_civil_zone() -> String {
    DEFAULT_CIVIL_ZONE.to_string()
}

fn default_epsilon() -> i64 {
    1
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            civil_zone: default_civil_zone(),
            inconsistency_epsilon_cents: default_epsilon(),
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

/// Tracing subscriber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive string.
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info,confreg=debug".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
            json: false,
        }
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
///
/// ## Example Config File
/// ```toml
/// [database]
/// path = "/var/lib/confreg/confreg.db"
/// max_connections = 5
///
/// [pricing]
/// civil_zone = "America/New_York"
/// inconsistency_epsilon_cents = 1
///
/// [logging]
/// filter = "info,confreg=debug"
/// json = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if CivilZone::from_name(&self.pricing.civil_zone).is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown civil zone '{}'",
                self.pricing.civil_zone
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.pricing.inconsistency_epsilon_cents < 0 {
            return Err(ConfigError::Invalid(
                "inconsistency_epsilon_cents must not be negative".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CONFREG_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("CONFREG_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid CONFREG_DB_MAX_CONNECTIONS"),
            }
        }

        if let Ok(zone) = std::env::var("CONFREG_CIVIL_ZONE") {
            debug!(zone = %zone, "Overriding civil zone from environment");
            self.pricing.civil_zone = zone;
        }

        if let Ok(epsilon) = std::env::var("CONFREG_INCONSISTENCY_EPSILON_CENTS") {
            match epsilon.parse::<i64>() {
                Ok(cents) => self.pricing.inconsistency_epsilon_cents = cents,
                Err(_) => warn!(
                    value = %epsilon,
                    "Ignoring invalid CONFREG_INCONSISTENCY_EPSILON_CENTS"
                ),
            }
        }

        if let Ok(filter) = std::env::var("CONFREG_LOG") {
            self.logging.filter = filter;
        }

        if let Ok(json) = std::env::var("CONFREG_LOG_JSON") {
            self.logging.json = matches!(json.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "confreg", "confreg")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The configured civil zone.
    pub fn civil_zone(&self) -> Result<CivilZone, ConfigError> {
        CivilZone::from_name(&self.pricing.civil_zone)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// The inconsistency tolerance as money.
    pub fn epsilon(&self) -> Money {
        Money::from_cents(self.pricing.inconsistency_epsilon_cents)
    }

    /// Pool settings for [`confreg_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}
