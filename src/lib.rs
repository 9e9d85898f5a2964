//! check-cert library
//!
//! Certificate chain validation for Nagios-compatible monitoring:
//! - Chain retrieval over TLS or from PEM files
//! - Chain position classification (leaf, intermediate, root)
//! - Expiration, hostname, SANs, signature, ordering and root checks
//! - Plugin output assembly with performance data and encoded payloads
//!
//! # Usage
//!
//! ```rust,ignore
//! use check_cert::certificate::read_pem_file;
//! use check_cert::validation::{validate_chain, CheckConfig};
//!
//! let chain = read_pem_file("chain.pem".as_ref())?;
//! let config = CheckConfig::new("www.example.com");
//! let results = validate_chain(&chain, &config);
//! println!("{}", results.service_output());
//! ```

pub mod certificate;
pub mod cli;
pub mod config;
pub mod models;
pub mod output;
pub mod payload;
pub mod plugin;
pub mod runner;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use cli::Cli;
pub use config::Settings;
pub use models::{Certificate, ServiceState};
pub use plugin::Plugin;
pub use utils::{CheckCertError, Result};
pub use validation::{validate_chain, CheckConfig, ValidationResults};
