//! JSON document embedded as the encoded payload

use crate::certificate::chain::positions;
use crate::certificate::ChainPosition;
use crate::models::{Certificate, ServiceState};
use crate::validation::{ValidationResult, ValidationResults};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Bumped whenever the document shape changes incompatibly
pub const PAYLOAD_FORMAT_VERSION: u32 = 1;

/// Per-certificate entry of the payload
#[derive(Debug, Clone, Serialize)]
pub struct CertReport {
    pub position: ChainPosition,
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub days_remaining: i64,
    pub sans: Vec<String>,
    pub signature_algorithm: String,
    pub sha256_fingerprint: String,
}

/// Per-check entry of the payload
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub name: String,
    pub state: ServiceState,
    pub ignored: bool,
    pub status: String,
}

/// Machine-readable summary of one plugin run
#[derive(Debug, Clone, Serialize)]
pub struct PayloadDocument {
    pub format_version: u32,
    pub server: String,
    pub port: Option<u16>,
    pub dns_name: String,
    pub service_state: ServiceState,
    pub certs: Vec<CertReport>,
    pub validations: Vec<ValidationReport>,
}

impl PayloadDocument {
    pub fn new(
        server: impl Into<String>,
        port: Option<u16>,
        dns_name: impl Into<String>,
        chain: &[Certificate],
        results: &ValidationResults<'_>,
        now: DateTime<Utc>,
    ) -> Self {
        let certs = positions(chain)
            .into_iter()
            .zip(chain)
            .map(|(position, cert)| CertReport {
                position,
                subject: cert.subject.to_string(),
                issuer: cert.issuer.to_string(),
                serial: cert.serial_hex(),
                not_before: cert.not_before,
                not_after: cert.not_after,
                days_remaining: cert.days_remaining(now),
                sans: cert
                    .dns_names
                    .iter()
                    .cloned()
                    .chain(cert.ip_addresses.iter().map(|ip| ip.to_string()))
                    .collect(),
                signature_algorithm: cert.signature_algorithm_name(),
                sha256_fingerprint: cert.sha256_fingerprint(),
            })
            .collect();

        let validations = results
            .iter()
            .map(|r| ValidationReport {
                name: r.check_name().to_string(),
                state: r.service_state(),
                ignored: r.is_ignored(),
                status: r.status(),
            })
            .collect();

        Self {
            format_version: PAYLOAD_FORMAT_VERSION,
            server: server.into(),
            port,
            dns_name: dns_name.into(),
            service_state: results.service_state(),
            certs,
            validations,
        }
    }

    /// Compact JSON suitable for embedding
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
