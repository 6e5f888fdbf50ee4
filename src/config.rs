//! Library configuration.
//!
//! Loaded from `folio-media.toml` in the working directory, or from the path
//! given with `--config`. A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! root = ".folio-media"     # Directory holding the bucket and the media table
//! bucket = "blog-images"    # Bucket directory name under root
//! public_base_url = ""      # Base URL objects are served from ("" = file://)
//!
//! [uploads]
//! max_bytes = 5242880       # Largest accepted upload (5 MiB)
//!
//! [identity]
//! owner = ""                # Signed-in owner ("" = signed out)
//!
//! [fetch]
//! timeout_secs = 30         # HTTP timeout when reading image URLs
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [identity]
//! owner = "alice"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "folio-media.toml";

/// File name of the media table inside the storage root.
pub const RECORDS_FILE: &str = "media.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `folio-media.toml`.
///
/// All fields have defaults; files only specify what they override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    pub storage: StorageConfig,
    pub uploads: UploadsConfig,
    pub identity: IdentityConfig,
    pub fetch: FetchConfig,
}

impl MediaConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.root must not be empty".into(),
            ));
        }
        let bucket = self.storage.bucket.trim();
        if bucket.is_empty() || bucket.contains('/') {
            return Err(ConfigError::Validation(
                "storage.bucket must be a non-empty name without '/'".into(),
            ));
        }
        if self.uploads.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "uploads.max_bytes must be positive".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub root: String,
    pub bucket: String,
    /// Base URL objects are served from. Empty serves `file://` URLs.
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: ".folio-media".to_string(),
            bucket: "blog-images".to_string(),
            public_base_url: String::new(),
        }
    }
}

impl StorageConfig {
    pub fn bucket_dir(&self) -> PathBuf {
        Path::new(&self.root).join(&self.bucket)
    }

    pub fn records_path(&self) -> PathBuf {
        Path::new(&self.root).join(RECORDS_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    pub max_bytes: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Owner id; empty means nobody is signed in.
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(MediaConfig::default())?)
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

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<MediaConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: MediaConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, merged over stock defaults and validated.
pub fn load_config(path: &Path) -> Result<MediaConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `folio-media.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Media Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory holding the bucket directory and the media table (media.json).
root = ".folio-media"

# Bucket name. Objects live in <root>/<bucket>/<owner>/.
bucket = "blog-images"

# Base URL objects are served from. Only URLs starting with this base are
# managed storage: deleting such an item also deletes the stored object,
# when it lies under the signed-in owner's prefix. For example
# "https://cdn.example.com/storage/v1/object/public/blog-images/".
# Leave empty to use file:// URLs into the bucket directory.
public_base_url = ""

# ---------------------------------------------------------------------------
# Uploads
# ---------------------------------------------------------------------------
[uploads]
# Largest file accepted by `upload`, in bytes (default 5 MiB).
max_bytes = 5242880

# ---------------------------------------------------------------------------
# Identity
# ---------------------------------------------------------------------------
[identity]
# Owner all uploads and records belong to. Empty means signed out: the
# library lists nothing and every change is refused.
# Can be overridden with --owner.
owner = ""

# ---------------------------------------------------------------------------
# Fetching
# ---------------------------------------------------------------------------
[fetch]
# Timeout in seconds for reading http(s) image URLs.
timeout_secs = 30
"##
}
