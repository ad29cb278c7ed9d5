//! Service configuration module.
//!
//! Handles loading, validating, and merging the edge function's `config.toml`.
//! Stock defaults reproduce the values the service has always run with; a
//! config file needs only the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! log_level = "info"           # tracing EnvFilter directive
//!
//! [storage]
//! bucket = "u-market"          # Bucket holding the original assets
//! region = "ap-northeast-2"    # Bucket region
//! # endpoint = "http://localhost:9000"  # S3-compatible endpoint override
//!
//! [limits]
//! max_width = 1280             # Bound used when `w` is missing or not a number
//! max_height = 720             # Bound used when `h` is missing or not a number
//!
//! [heic]
//! conversion_quality = 100     # JPEG quality for the HEIC → JPEG step (1-100)
//!
//! [responses]
//! unsupported_extension = 415  # Source extension not on the allow-list
//! not_found = 404              # Object store lookup failed
//! transcode_failure = 502      # Decode / convert / resize / encode failed
//! cancelled = 503              # Invocation deadline reached mid-request
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
///
/// Passed explicitly into [`Pipeline`](crate::pipeline::Pipeline); nothing in
/// the crate reads configuration from globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `tracing` filter directive, e.g. `"info"` or `"image_edge=debug"`.
    pub log_level: String,
    /// Where original assets live.
    pub storage: StorageConfig,
    /// Fallback resize bounds.
    pub limits: LimitsConfig,
    /// HEIC normalisation settings.
    pub heic: HeicConfig,
    /// HTTP status for each error class.
    pub responses: ResponsesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            limits: LimitsConfig::default(),
            heic: HeicConfig::default(),
            responses: ResponsesConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.bucket must not be empty".into(),
            ));
        }
        if self.limits.max_width == 0 || self.limits.max_height == 0 {
            return Err(ConfigError::Validation(
                "limits.max_width and limits.max_height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.heic.conversion_quality) {
            return Err(ConfigError::Validation(
                "heic.conversion_quality must be 1-100".into(),
            ));
        }
        for (name, status) in self.responses.entries() {
            if !(400..=599).contains(&status) {
                return Err(ConfigError::Validation(format!(
                    "responses.{name} must be an HTTP error status (400-599), got {status}"
                )));
            }
        }
        Ok(())
    }
}

/// Object store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom S3-compatible endpoint. When absent the SDK resolves the AWS one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "u-market".to_string(),
            region: "ap-northeast-2".to_string(),
            endpoint: None,
        }
    }
}

/// Resize bounds substituted for a missing or non-numeric `w` / `h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_width: 1280,
            max_height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeicConfig {
    /// JPEG quality for the intermediate HEIC conversion.
    pub conversion_quality: u32,
}

impl Default for HeicConfig {
    fn default() -> Self {
        Self {
            conversion_quality: 100,
        }
    }
}

/// HTTP status codes returned for each failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponsesConfig {
    pub unsupported_extension: u16,
    pub not_found: u16,
    pub transcode_failure: u16,
    pub cancelled: u16,
}

impl Default for ResponsesConfig {
    fn default() -> Self {
        Self {
            unsupported_extension: 415,
            not_found: 404,
            transcode_failure: 502,
            cancelled: 503,
        }
    }
}

impl ResponsesConfig {
    /// The mapping the first deployment shipped with: 500 for a rejected
    /// extension, 404 for every fetch or transcode failure.
    pub fn legacy() -> Self {
        Self {
            unsupported_extension: 500,
            not_found: 404,
            transcode_failure: 404,
            ..Self::default()
        }
    }

    fn entries(&self) -> [(&'static str, u16); 4] {
        [
            ("unsupported_extension", self.unsupported_extension),
            ("not_found", self.not_found),
            ("transcode_failure", self.transcode_failure),
            ("cancelled", self.cancelled),
        ]
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse TOML text, merge it over the stock defaults, and validate.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value()?, overlay);
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// `None` yields the validated stock defaults, so the function runs with no
/// file shipped alongside it.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => parse_config(&fs::read_to_string(path)?),
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-edge configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# tracing filter directive (e.g. "debug", "image_edge=trace").
log_level = "info"

# ---------------------------------------------------------------------------
# Object store holding the original images
# ---------------------------------------------------------------------------
[storage]
bucket = "u-market"
region = "ap-northeast-2"
# S3-compatible endpoint override (MinIO, LocalStack, ...).
# endpoint = "http://localhost:9000"

# ---------------------------------------------------------------------------
# Resize bounds
# ---------------------------------------------------------------------------
[limits]
# Used in place of a missing or non-numeric `w` / `h` query parameter.
max_width = 1280
max_height = 720

# ---------------------------------------------------------------------------
# HEIC sources
# ---------------------------------------------------------------------------
[heic]
# JPEG quality (1-100) of the intermediate image decoded from HEIC.
conversion_quality = 100

# ---------------------------------------------------------------------------
# Error responses
# ---------------------------------------------------------------------------
[responses]
# Source extension is not on the allow-list (also: missing extension, unknown `f`).
unsupported_extension = 415
# Object store lookup failed for any reason.
not_found = 404
# Decode, HEIC conversion, resize or encode failed.
transcode_failure = 502
# The invocation deadline passed before a response was ready.
cancelled = 503
#
# The first deployment's mapping (see ResponsesConfig::legacy):
# unsupported_extension = 500
# transcode_failure = 404
"##
}
