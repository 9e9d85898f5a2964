//! Custom error types for check-cert
//!
//! This module defines domain-specific error types using `thiserror` for
//! the failure modes of certificate retrieval, chain validation, plugin
//! output assembly and the encoded payload codec.

use std::io;
use thiserror::Error;

/// Top-level error type for the check-cert library
#[derive(Error, Debug)]
pub enum CheckCertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error("retrieval error: {0}")]
    Fetch(#[from] FetchError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("performance data error: {0}")]
    PerfData(#[from] PerfDataError),

    #[error("threshold range error: {0}")]
    Range(#[from] RangeError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Taxonomic classification of a failure.
///
/// The names returned by [`ErrorKind::as_str`] are what monitoring users
/// see at the start of each ERRORS bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingValue,
    InvalidInput,
    ExpiredCertFound,
    ExpiringCertFound,
    HostnameMismatch,
    SansMismatch,
    MisorderedChain,
    WeakSignature,
    RootPresentInChain,
    PayloadNotFound,
    PayloadInvalid,
    PayloadRegexInvalid,
    CompressedInputInvalid,
    PanicDetected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingValue => "missing-value",
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::ExpiredCertFound => "expired-cert-found",
            ErrorKind::ExpiringCertFound => "expiring-cert-found",
            ErrorKind::HostnameMismatch => "hostname-mismatch",
            ErrorKind::SansMismatch => "sans-mismatch",
            ErrorKind::MisorderedChain => "misordered-chain",
            ErrorKind::WeakSignature => "weak-signature",
            ErrorKind::RootPresentInChain => "root-present-in-chain",
            ErrorKind::PayloadNotFound => "payload-not-found",
            ErrorKind::PayloadInvalid => "payload-invalid",
            ErrorKind::PayloadRegexInvalid => "payload-regex-invalid",
            ErrorKind::CompressedInputInvalid => "compressed-input-invalid",
            ErrorKind::PanicDetected => "panic-detected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure conditions raised by the validation checks.
///
/// Checks embed these in their results rather than returning them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing-value: {0}")]
    MissingValue(String),

    #[error("invalid-input: {0}")]
    InvalidInput(String),

    #[error("expired-cert-found: {0}")]
    ExpiredCertFound(String),

    #[error("expiring-cert-found: {0}")]
    ExpiringCertFound(String),

    #[error("hostname-mismatch: {0}")]
    HostnameMismatch(String),

    #[error("sans-mismatch: {0}")]
    SansMismatch(String),

    #[error("misordered-chain: {0}")]
    MisorderedChain(String),

    #[error("weak-signature: {0}")]
    WeakSignature(String),

    #[error("root-present-in-chain: {0}")]
    RootPresentInChain(String),

    #[error("panic-detected: {0}")]
    PanicDetected(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MissingValue(_) => ErrorKind::MissingValue,
            ValidationError::InvalidInput(_) => ErrorKind::InvalidInput,
            ValidationError::ExpiredCertFound(_) => ErrorKind::ExpiredCertFound,
            ValidationError::ExpiringCertFound(_) => ErrorKind::ExpiringCertFound,
            ValidationError::HostnameMismatch(_) => ErrorKind::HostnameMismatch,
            ValidationError::SansMismatch(_) => ErrorKind::SansMismatch,
            ValidationError::MisorderedChain(_) => ErrorKind::MisorderedChain,
            ValidationError::WeakSignature(_) => ErrorKind::WeakSignature,
            ValidationError::RootPresentInChain(_) => ErrorKind::RootPresentInChain,
            ValidationError::PanicDetected(_) => ErrorKind::PanicDetected,
        }
    }

    /// Whether the failure is about the inputs rather than the chain.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ValidationError::MissingValue(_) | ValidationError::InvalidInput(_)
        )
    }
}

/// Certificate parsing errors
#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("failed to parse certificate: {message}")]
    ParseError { message: String },

    #[error("invalid timestamp in certificate {field}")]
    InvalidTimestamp { field: &'static str },

    #[error("failed to read {path}: {message}")]
    FileReadError { path: String, message: String },

    #[error("no CERTIFICATE blocks found in {source_name}")]
    NoCertificates { source_name: String },
}

/// Chain retrieval errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid server name: {name}")]
    InvalidServerName { name: String },

    #[error("failed to resolve {address}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("no addresses found for {address}")]
    NoAddresses { address: String },

    #[error("failed to connect to {address}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("TLS handshake with {address} failed")]
    Handshake {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("TLS configuration error: {message}")]
    TlsConfig { message: String },

    #[error("no certificates received from {address}")]
    NoCertificates { address: String },

    #[error("failed to parse certificate #{index} from {address}: {message}")]
    Parse {
        address: String,
        index: usize,
        message: String,
    },
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("unknown validation keyword {keyword:?}; valid keywords: {valid}")]
    UnknownValidationKeyword { keyword: String, valid: String },

    #[error("validation keyword {keyword:?} is present in both the apply and ignore lists")]
    ConflictingValidationKeyword { keyword: String },

    #[error("either a server or a filename must be specified")]
    MissingTarget,
}

/// Encoded payload errors
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("payload-not-found: no encoded payload found in input")]
    NotFound,

    #[error("payload-invalid: {message}")]
    Invalid { message: String },

    #[error("payload-regex-invalid: {0}")]
    RegexInvalid(#[from] regex::Error),

    #[error("compressed-input-invalid: {0}")]
    CompressedInputInvalid(#[source] io::Error),
}

impl PayloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PayloadError::NotFound => ErrorKind::PayloadNotFound,
            PayloadError::Invalid { .. } => ErrorKind::PayloadInvalid,
            PayloadError::RegexInvalid(_) => ErrorKind::PayloadRegexInvalid,
            PayloadError::CompressedInputInvalid(_) => ErrorKind::CompressedInputInvalid,
        }
    }
}

/// Performance data validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PerfDataError {
    #[error("performance data label is empty")]
    EmptyLabel,

    #[error("performance data label {label:?} contains a single quote")]
    QuoteInLabel { label: String },

    #[error("performance data value for {label:?} is not a finite number")]
    NonFiniteValue { label: String },

    #[error("unsupported unit of measurement {uom:?} for {label:?}")]
    InvalidUom { label: String, uom: String },
}

/// Range threshold parse errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("empty range expression")]
    Empty,

    #[error("invalid range {input:?}: {message}")]
    Invalid { input: String, message: String },

    #[error("invalid range {input:?}: start {start} is greater than end {end}")]
    StartAfterEnd { input: String, start: f64, end: f64 },
}

/// Result type alias using CheckCertError
pub type Result<T> = std::result::Result<T, CheckCertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_leads_with_kind() {
        let err = ValidationError::HostnameMismatch("foo".to_string());
        assert_eq!(err.kind(), ErrorKind::HostnameMismatch);
        assert!(err.to_string().starts_with("hostname-mismatch: "));
    }

    #[test]
    fn test_input_errors() {
        assert!(ValidationError::MissingValue("x".into()).is_input_error());
        assert!(ValidationError::InvalidInput("x".into()).is_input_error());
        assert!(!ValidationError::SansMismatch("x".into()).is_input_error());
    }

    #[test]
    fn test_payload_error_kind_names() {
        assert_eq!(PayloadError::NotFound.kind().as_str(), "payload-not-found");
        assert!(PayloadError::NotFound
            .to_string()
            .starts_with("payload-not-found"));
    }
}
