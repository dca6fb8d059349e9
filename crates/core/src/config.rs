//! Configuration for the session core
//!
//! Settings are layered: built-in defaults, then an optional file, then
//! `PORTAL_*` environment variables (nested keys separated by `__`, e.g.
//! `PORTAL_SESSION__MODE=legacy`).

use crate::error::Result;
use crate::grant::DEFAULT_SESSION_TTL_SECS;
use chrono::Duration;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "PORTAL";

/// How the logged-in flag is maintained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Setters assign the flag directly and reading the token clears it
    Legacy,
    /// The flag is computed from token and expiry on every query
    #[default]
    Derived,
}

impl SessionMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Derived => "derived",
        }
    }
}

/// Session behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mode: SessionMode,
    /// Lifetime of locally issued grants, in seconds
    pub default_ttl_secs: u64,
    /// Seconds shaved off every expiry before comparing it to the clock
    pub clock_skew_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            default_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            clock_skew_secs: 0,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        i64::try_from(self.default_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        Duration::try_seconds(self.clock_skew_secs).unwrap_or(Duration::MAX)
    }

    /// Check the values make sense together
    ///
    /// # Errors
    ///
    /// Returns an error for a zero TTL or a negative clock skew
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.default_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "session.default_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.clock_skew_secs < 0 {
            return Err(ConfigError::Message(format!(
                "session.clock_skew_secs must not be negative, got {}",
                self.clock_skew_secs
            )));
        }
        if self.clock_skew_secs.unsigned_abs() >= self.default_ttl_secs {
            return Err(ConfigError::Message(format!(
                "session.clock_skew_secs ({}) would expire every grant of {}s on arrival",
                self.clock_skew_secs, self.default_ttl_secs
            )));
        }
        Ok(())
    }
}

/// Logging setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Service name attached to log output
    pub service_name: String,
    /// Log level filter (e.g., "info", "debug", "portal_core=trace")
    pub log_level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "portal".to_string(),
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl InstrumentationConfig {
    /// Defaults overridden by `SERVICE_NAME` and `RUST_LOG`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            json: defaults.json,
        }
    }
}

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub session: SessionConfig,
    pub instrumentation: InstrumentationConfig,
}

impl PortalConfig {
    /// Load configuration from a file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or fails validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?;

        let loaded: Self = settings.try_deserialize()?;
        loaded.session.validate()?;
        Ok(loaded)
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed or fail validation
    pub fn from_env() -> Result<Self> {
        let settings = Self::builder()?.add_source(Self::environment()).build()?;

        let loaded: Self = settings.try_deserialize()?;
        loaded.session.validate()?;
        Ok(loaded)
    }

    // Instrumentation defaults already honour `SERVICE_NAME` and `RUST_LOG`.
    fn builder() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Self {
            instrumentation: InstrumentationConfig::from_env(),
            ..Self::default()
        };

        config::Config::builder()
            .set_default("session.mode", defaults.session.mode.as_str())?
            .set_default("session.default_ttl_secs", defaults.session.default_ttl_secs)?
            .set_default("session.clock_skew_secs", defaults.session.clock_skew_secs)?
            .set_default("instrumentation.service_name", defaults.instrumentation.service_name)?
            .set_default("instrumentation.log_level", defaults.instrumentation.log_level)?
            .set_default("instrumentation.json", defaults.instrumentation.json)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }
}
