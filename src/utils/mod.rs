//! Utility modules for check-cert
//!
//! This module contains the error types shared across the crate.

pub mod error;

pub use error::{
    CertificateError, CheckCertError, ConfigError, ErrorKind, FetchError, PayloadError,
    PerfDataError, RangeError, Result, ValidationError,
};
