//! # Configuration
//!
//! An [`AssemblerConfig`] holds what an [`Assembler`](crate::Assembler) is
//! constructed with (protocol version and verification mode) and the level
//! and format handed to [`init_logging`](crate::utils::logging::init_logging).
//!
//! ```toml
//! protocol = 4
//! verify = true
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```

use crate::error::{AssemblerError, Result};
use crate::protocol::HIGHEST_PROTOCOL;
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// Protocol used when none is configured (the text-mode protocol)
pub const DEFAULT_PROTOCOL: u8 = 0;

/// Whether opcodes are checked against the protocol version by default
pub const DEFAULT_VERIFY: bool = true;

pub const ENV_PROTOCOL: &str = "PICKLE_ASSEMBLER_PROTOCOL";
pub const ENV_VERIFY: &str = "PICKLE_ASSEMBLER_VERIFY";
pub const ENV_LOG_LEVEL: &str = "PICKLE_ASSEMBLER_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssemblerConfig {
    /// Protocol version, 0 through [`HIGHEST_PROTOCOL`]
    pub protocol: u8,

    /// Reject opcodes newer than `protocol` instead of emitting them
    pub verify: bool,

    pub logging: LoggingConfig,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL,
            verify: DEFAULT_VERIFY,
            logging: LoggingConfig::default(),
        }
    }
}

impl AssemblerConfig {
    /// Parse and validate a TOML document; missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AssemblerError::ConfigError(format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `PICKLE_ASSEMBLER_*` environment variables.
    ///
    /// A variable that is set but does not parse is an error rather than
    /// being skipped.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        env_override(ENV_PROTOCOL, &mut config.protocol)?;
        env_override(ENV_VERIFY, &mut config.verify)?;
        env_override(ENV_LOG_LEVEL, &mut config.logging.level)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.protocol > HIGHEST_PROTOCOL {
            return Err(AssemblerError::ConfigError(format!(
                "Unsupported protocol: {} (valid range: 0-{HIGHEST_PROTOCOL})",
                self.protocol
            )));
        }
        Ok(())
    }
}

fn env_override<T>(name: &str, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: Display,
{
    let Ok(raw) = std::env::var(name) else {
        return Ok(());
    };
    *slot = raw
        .trim()
        .parse()
        .map_err(|e| AssemblerError::ConfigError(format!("Invalid {name}={raw:?}: {e}")))?;
    Ok(())
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter level; `RUST_LOG` still takes precedence
    #[serde(deserialize_with = "level_from_str")]
    pub level: LevelFilter,

    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            json: false,
        }
    }
}

fn level_from_str<'de, D>(deserializer: D) -> std::result::Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse()
        .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {raw}")))
}
