//! Hostname matching against Subject Alternative Names

use crate::models::Certificate;
use std::net::IpAddr;

/// Match a single SAN DNS entry against a hostname.
///
/// Comparison is case-insensitive and ignores a trailing dot. A leading
/// `*.` wildcard covers exactly one label and never the bare parent domain.
pub fn matches_dns_name(pattern: &str, hostname: &str) -> bool {
    let pattern = pattern.trim().trim_end_matches('.').to_ascii_lowercase();
    let hostname = hostname.trim().trim_end_matches('.').to_ascii_lowercase();

    if pattern.is_empty() || hostname.is_empty() {
        return false;
    }

    if let Some(wildcard_domain) = pattern.strip_prefix("*.") {
        return match hostname.split_once('.') {
            Some((label, rest)) => !label.is_empty() && rest == wildcard_domain,
            None => false,
        };
    }

    pattern == hostname
}

/// Whether the certificate's SANs cover `name`.
///
/// IP literals are compared against IP SAN entries, everything else against
/// DNS SAN entries. The subject Common Name is never consulted.
pub fn verify_hostname(cert: &Certificate, name: &str) -> bool {
    let trimmed = name.trim().trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return cert.ip_addresses.contains(&ip);
    }

    cert.dns_names
        .iter()
        .any(|pattern| matches_dns_name(pattern, name))
}
