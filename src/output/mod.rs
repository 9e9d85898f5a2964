//! Output formatting module
//!
//! Provides the renderings that feed the plugin artifact:
//! - Plain-text chain summary for the DETAILED INFO section
//! - JSON document for the encoded payload

pub mod chain;
pub mod json;

pub use chain::format_chain_summary;
pub use json::{CertReport, PayloadDocument, ValidationReport, PAYLOAD_FORMAT_VERSION};
