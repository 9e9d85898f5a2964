//! Data models for check-cert
//!
//! This module contains the certificate and service-state types shared by
//! the validation engine and the plugin output assembler.

pub mod certificate;
pub mod state;

pub use certificate::{digest_name, signature_algorithm_name, Certificate, DistinguishedName};
pub use state::ServiceState;
