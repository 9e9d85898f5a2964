//! Certificate handling module
//!
//! This module provides functionality for:
//! - Parsing DER and PEM certificates into [`crate::models::Certificate`]
//! - Classifying certificates by their position in a chain
//! - Matching hostnames against Subject Alternative Names
//! - Retrieving the chain a TLS service presents

pub mod chain;
pub mod fetch;
pub mod hostname;
pub mod parse;

pub use chain::{classify, leaf, leaf_index, positions, ChainPosition, PositionCounts};
pub use fetch::{fetch_chain, FetchTarget, FetchedChain};
pub use hostname::{matches_dns_name, verify_hostname};
pub use parse::{parse_certificate, parse_chain, parse_pem_chain, read_pem_file};
