//! Certificate information types

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::IpAddr;
use x509_parser::prelude::*;

/// Distinguished name of a certificate subject or issuer.
///
/// Equality is decided on the full RFC 4514 rendering of the name, the
/// individual attributes are kept for display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DistinguishedName {
    /// Common name (CN)
    pub common_name: Option<String>,
    /// Organization (O), multi-valued
    pub organization: Vec<String>,
    /// Organizational unit (OU), multi-valued
    pub organizational_unit: Vec<String>,
    /// Country (C)
    pub country: Option<String>,
    /// State or province (ST)
    pub state: Option<String>,
    /// Locality (L)
    pub locality: Option<String>,
    /// Full RFC 4514 rendering
    pub rfc4514: String,
}

impl DistinguishedName {
    /// Create a name with only a common name set
    pub fn from_common_name(cn: impl Into<String>) -> Self {
        let cn = cn.into();
        Self {
            rfc4514: format!("CN={}", cn),
            common_name: Some(cn),
            ..Self::default()
        }
    }

    /// Add an organization, keeping the RFC 4514 rendering in step
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        let org = org.into();
        self.rfc4514 = format!("{}, O={}", self.rfc4514, org);
        self.organization.push(org);
        self
    }

    /// Common name if present, otherwise the full name
    pub fn display_name(&self) -> &str {
        self.common_name.as_deref().unwrap_or(&self.rfc4514)
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.rfc4514 == other.rfc4514
    }
}

impl Eq for DistinguishedName {}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rfc4514)
    }
}

/// A parsed X.509 certificate.
///
/// Read-only after ingestion; chain position is not stored here, it is
/// computed against the enclosing chain.
#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    /// Certificate subject
    pub subject: DistinguishedName,
    /// Certificate issuer
    pub issuer: DistinguishedName,
    /// Serial number, big-endian bytes
    pub serial: Vec<u8>,
    /// Not valid before
    pub not_before: DateTime<Utc>,
    /// Not valid after
    pub not_after: DateTime<Utc>,
    /// DNS names from the Subject Alternative Name extension, in order
    pub dns_names: Vec<String>,
    /// IP addresses from the Subject Alternative Name extension
    pub ip_addresses: Vec<IpAddr>,
    /// Signature algorithm OID in dotted form
    pub signature_algorithm: String,
    /// Digest OID from RSASSA-PSS parameters; `None` for other algorithms
    pub signature_digest: Option<String>,
    /// Raw certificate in DER format
    #[serde(skip)]
    pub raw_der: Vec<u8>,
}

impl Certificate {
    /// Serial number as colon-separated upper-case hex
    pub fn serial_hex(&self) -> String {
        self.serial
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Whether the issuer and subject names are identical
    pub fn is_self_issued(&self) -> bool {
        self.issuer == self.subject
    }

    /// Expired means NotAfter strictly before `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.not_after < now
    }

    /// Not expired, but NotAfter falls before `threshold`
    pub fn is_expiring(&self, now: DateTime<Utc>, threshold: DateTime<Utc>) -> bool {
        !self.is_expired(now) && self.not_after < threshold
    }

    /// Time left until NotAfter (negative once expired)
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.not_after.signed_duration_since(now)
    }

    /// Whole days until NotAfter (negative once expired)
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.time_remaining(now).num_days()
    }

    /// Share of the validity period still left, clamped to 0..=100
    pub fn life_remaining_percent(&self, now: DateTime<Utc>) -> f64 {
        let total = self
            .not_after
            .signed_duration_since(self.not_before)
            .num_seconds();
        if total <= 0 {
            return 0.0;
        }
        let left = self.time_remaining(now).num_seconds();
        let percent = left as f64 * 100.0 / total as f64;
        percent.clamp(0.0, 100.0)
    }

    /// Human-readable signature algorithm name, with the digest for RSA-PSS
    pub fn signature_algorithm_name(&self) -> String {
        let name = signature_algorithm_name(&self.signature_algorithm);
        match &self.signature_digest {
            Some(digest) => format!("{} ({})", name, digest_name(digest)),
            None => name,
        }
    }

    /// SHA-256 fingerprint of the DER encoding, colon-separated hex
    pub fn sha256_fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.raw_der);
        let encoded = hex::encode_upper(digest);
        encoded
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Whether this certificate's signature verifies with the public key of
    /// `issuer`. Certificates without DER bytes never verify.
    pub fn is_signed_by(&self, issuer: &Certificate) -> bool {
        let Ok((_, child)) = X509Certificate::from_der(&self.raw_der) else {
            return false;
        };
        let Ok((_, parent)) = X509Certificate::from_der(&issuer.raw_der) else {
            return false;
        };
        child.verify_signature(Some(parent.public_key())).is_ok()
    }
}

/// Convert a digest algorithm OID to a human-readable name
pub fn digest_name(oid: &str) -> String {
    let name = match oid {
        "1.2.840.113549.2.2" => "MD2",
        "1.2.840.113549.2.4" => "MD4",
        "1.2.840.113549.2.5" => "MD5",
        "1.3.14.3.2.26" => "SHA1",
        "2.16.840.1.101.3.4.2.4" => "SHA224",
        "2.16.840.1.101.3.4.2.1" => "SHA256",
        "2.16.840.1.101.3.4.2.2" => "SHA384",
        "2.16.840.1.101.3.4.2.3" => "SHA512",
        other => return other.to_string(),
    };
    name.to_string()
}

/// Convert a signature algorithm OID to a human-readable name
pub fn signature_algorithm_name(oid: &str) -> String {
    let name = match oid {
        "1.2.840.113549.1.1.2" => "MD2withRSA",
        "1.2.840.113549.1.1.3" => "MD4withRSA",
        "1.2.840.113549.1.1.4" => "MD5withRSA",
        "1.2.840.113549.1.1.5" => "SHA1withRSA",
        "1.3.14.3.2.29" => "SHA1withRSA",
        "1.2.840.10040.4.3" => "DSAwithSHA1",
        "1.2.840.10045.4.1" => "ECDSA-SHA1",
        "1.2.840.113549.1.1.11" => "SHA256withRSA",
        "1.2.840.113549.1.1.12" => "SHA384withRSA",
        "1.2.840.113549.1.1.13" => "SHA512withRSA",
        "1.2.840.113549.1.1.10" => "RSA-PSS",
        "1.2.840.10045.4.3.2" => "ECDSA-SHA256",
        "1.2.840.10045.4.3.3" => "ECDSA-SHA384",
        "1.2.840.10045.4.3.4" => "ECDSA-SHA512",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        other => return other.to_string(),
    };
    name.to_string()
}
