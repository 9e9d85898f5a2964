//! Configuration module for check-cert
//!
//! Handles loading plugin settings from TOML files.

pub mod settings;

pub use settings::{
    ConnectionSettings, OutputSettings, Settings, ThresholdSettings, DEFAULT_CONFIG_FILE,
};

use crate::utils::ConfigError;
use std::path::Path;

/// Load settings from `path` when given, otherwise from the default location
pub fn load_settings<P: AsRef<Path>>(path: Option<P>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => Settings::load_from_file(path),
        None => Settings::load_default(),
    }
}
