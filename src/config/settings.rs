//! Plugin settings configuration
//!
//! Defines default thresholds, connection parameters and output labels.
//! Every field is optional in the TOML file; command-line flags override
//! whatever is loaded here.

use crate::plugin::{
    DEFAULT_DETAILED_INFO_LABEL, DEFAULT_ENCODED_PAYLOAD_LABEL, DEFAULT_ERRORS_LABEL,
    DEFAULT_THRESHOLDS_LABEL,
};
use crate::payload::{DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER};
use crate::utils::ConfigError;
use crate::validation::options::{DEFAULT_AGE_CRITICAL, DEFAULT_AGE_WARNING};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Settings file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "check_cert.toml";

/// Expiration thresholds, in days
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdSettings {
    pub age_warning: u32,
    pub age_critical: u32,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            age_warning: DEFAULT_AGE_WARNING,
            age_critical: DEFAULT_AGE_CRITICAL,
        }
    }
}

/// Network retrieval settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionSettings {
    pub timeout_secs: u64,
    pub port: u16,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            port: 443,
        }
    }
}

impl ConnectionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Plugin artifact settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub hide_errors: bool,
    pub hide_thresholds: bool,
    pub errors_label: String,
    pub thresholds_label: String,
    pub detailed_info_label: String,
    pub encoded_payload_label: String,
    pub payload_delimiter_left: String,
    pub payload_delimiter_right: String,
    pub annotate_errors: bool,
    pub embed_payload: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            hide_errors: false,
            hide_thresholds: false,
            errors_label: DEFAULT_ERRORS_LABEL.to_string(),
            thresholds_label: DEFAULT_THRESHOLDS_LABEL.to_string(),
            detailed_info_label: DEFAULT_DETAILED_INFO_LABEL.to_string(),
            encoded_payload_label: DEFAULT_ENCODED_PAYLOAD_LABEL.to_string(),
            payload_delimiter_left: DEFAULT_LEFT_DELIMITER.to_string(),
            payload_delimiter_right: DEFAULT_RIGHT_DELIMITER.to_string(),
            annotate_errors: true,
            embed_payload: false,
        }
    }
}

/// Plugin settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub thresholds: ThresholdSettings,
    pub connection: ConnectionSettings,
    pub output: OutputSettings,
}

impl Settings {
    /// Load `check_cert.toml` from the working directory, or defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_FILE);
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "connection.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.connection.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "connection.port".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.thresholds.age_warning, 30);
        assert_eq!(settings.thresholds.age_critical, 15);
        assert_eq!(settings.connection.port, 443);
        assert_eq!(settings.connection.timeout(), Duration::from_secs(10));
        assert!(settings.output.annotate_errors);
        assert!(!settings.output.embed_payload);
        assert_eq!(settings.output.errors_label, "**ERRORS**");
    }

    #[test]
    fn test_partial_sections() {
        let settings = Settings::from_toml(
            r#"
            [thresholds]
            age_warning = 45

            [output]
            hide_thresholds = true
            payload_delimiter_left = "START"
            "#,
        )
        .unwrap();
        assert_eq!(settings.thresholds.age_warning, 45);
        assert_eq!(settings.thresholds.age_critical, 15);
        assert!(settings.output.hide_thresholds);
        assert_eq!(settings.output.payload_delimiter_left, "START");
        assert_eq!(settings.output.payload_delimiter_right, "~>");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Settings::from_toml("[connection]\nretries = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = Settings::from_toml("[connection]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load_from_file("/nonexistent/check_cert.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
