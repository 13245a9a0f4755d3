//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across all FractalWave applications, plus the channel settings both
//! processes must agree on out of band.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fractal_common::config::{ConfigLoader, ConfigError, FractalConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = FractalConfig::load(Path::new("consumer.toml"))?;
//!     config.validate()?;
//!     println!("Reading {} bands from {}", config.channel.band_count, config.channel.shm_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_BAND_COUNT, DEFAULT_READY_NAME, DEFAULT_SHM_NAME, DEFAULT_TICK_HZ, MAX_BANDS,
    MAX_OBJECT_NAME_LEN, MAX_SEMAPHORE_NAME_LEN,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across all FractalWave applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "fractal-consumer"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "fractal-consumer".to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Names and shape of the band channel.
///
/// Both values are agreed with the producer out of band; they are plain
/// configuration so tests can point a simulated producer and the consumer
/// at private names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Name of the shared band region.
    pub shm_name: String,
    /// Name of the readiness signal.
    pub ready_name: String,
    /// Number of `f32` bands in the region.
    pub band_count: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            shm_name: DEFAULT_SHM_NAME.to_string(),
            ready_name: DEFAULT_READY_NAME.to_string(),
            band_count: DEFAULT_BAND_COUNT,
        }
    }
}

impl ChannelConfig {
    /// Channel settings with default names and the given band count.
    pub fn with_band_count(band_count: usize) -> Self {
        Self {
            band_count,
            ..Self::default()
        }
    }

    /// Validate names and band count.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if either name is not a valid
    /// POSIX object name, if `ready_name` is too long for a named semaphore,
    /// if both names are equal, or if `band_count` is outside `1..=MAX_BANDS`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let shm = posix_object_name(&self.shm_name).ok_or_else(|| {
            ConfigError::ValidationError(format!("invalid shm_name: {:?}", self.shm_name))
        })?;
        let ready = posix_object_name(&self.ready_name).ok_or_else(|| {
            ConfigError::ValidationError(format!("invalid ready_name: {:?}", self.ready_name))
        })?;
        if ready.len() - 1 > MAX_SEMAPHORE_NAME_LEN {
            return Err(ConfigError::ValidationError(format!(
                "ready_name longer than {MAX_SEMAPHORE_NAME_LEN} bytes"
            )));
        }
        if shm == ready {
            return Err(ConfigError::ValidationError(
                "shm_name and ready_name must differ".to_string(),
            ));
        }
        if self.band_count == 0 || self.band_count > MAX_BANDS {
            return Err(ConfigError::ValidationError(format!(
                "band_count must be in 1..={MAX_BANDS}, got {}",
                self.band_count
            )));
        }
        Ok(())
    }
}

/// Consumer tick settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerSettings {
    /// Ticks per second of the host loop.
    pub tick_hz: u32,
    /// Emit the band panel to the log every N ticks (0 disables).
    pub log_every: u64,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            log_every: u64::from(DEFAULT_TICK_HZ),
        }
    }
}

/// Complete configuration file of the consumer.
///
/// ```toml
/// [shared]
/// service_name = "fractal-consumer"
///
/// [channel]
/// shm_name = "/FractalWaveFFT"
/// ready_name = "/FractalWaveUnityReady"
/// band_count = 16
///
/// [consumer]
/// tick_hz = 60
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractalConfig {
    /// Common settings.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Channel names and shape.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Tick loop settings.
    #[serde(default)]
    pub consumer: ConsumerSettings,
}

impl FractalConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.channel.validate()?;
        if self.consumer.tick_hz == 0 {
            return Err(ConfigError::ValidationError(
                "tick_hz must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Normalize a named-object identifier to POSIX form (`/name`).
///
/// A leading slash is added when missing. Returns `None` for empty names,
/// names with an embedded `/` or NUL, or names longer than
/// [`MAX_OBJECT_NAME_LEN`].
pub fn posix_object_name(name: &str) -> Option<String> {
    let bare = name.strip_prefix('/').unwrap_or(name);
    if bare.is_empty() || bare.len() > MAX_OBJECT_NAME_LEN {
        return None;
    }
    if bare.contains('/') || bare.contains('\0') {
        return None;
    }
    Some(format!("/{bare}"))
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
