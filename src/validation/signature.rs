//! Weak signature algorithm check
//!
//! Roots are exempt: clients trust them by identity, not by signature.

use super::{
    cert_label, CheckConfig, Outcome, ValidationKeyword, ValidationResult,
    BASE_PRIORITY_WEAK_SIGNATURE, PRIORITY_MODIFIER_MAXIMUM,
};
use crate::certificate::chain::{positions, ChainPosition};
use crate::models::{Certificate, ServiceState};
use crate::utils::ValidationError;

/// Signature algorithm OIDs built on MD2, MD4, MD5 or SHA-1
const WEAK_SIGNATURE_OIDS: &[&str] = &[
    "1.2.840.113549.1.1.2",
    "1.2.840.113549.1.1.3",
    "1.2.840.113549.1.1.4",
    "1.2.840.113549.1.1.5",
    "1.3.14.3.2.29",
    "1.2.840.10040.4.3",
    "1.2.840.10045.4.1",
];

const WEAK_DIGESTS: &[&str] = &["MD2", "MD4", "MD5", "SHA1"];

/// Digest OIDs for MD2, MD4, MD5 and SHA-1
const WEAK_DIGEST_OIDS: &[&str] = &[
    "1.2.840.113549.2.2",
    "1.2.840.113549.2.4",
    "1.2.840.113549.2.5",
    "1.3.14.3.2.26",
];

/// Whether a signature algorithm (OID or name) uses a broken digest
pub fn is_weak_signature_algorithm(algorithm: &str) -> bool {
    if WEAK_SIGNATURE_OIDS.contains(&algorithm) {
        return true;
    }
    let normalized = algorithm.to_ascii_uppercase().replace('-', "");
    WEAK_DIGESTS.iter().any(|digest| normalized.contains(digest))
}

/// Whether `cert` is signed with a weak algorithm, including RSASSA-PSS
/// over a weak digest
pub fn has_weak_signature(cert: &Certificate) -> bool {
    is_weak_signature_algorithm(&cert.signature_algorithm)
        || cert
            .signature_digest
            .as_deref()
            .is_some_and(|digest| WEAK_DIGEST_OIDS.contains(&digest))
}

#[derive(Debug, Clone)]
pub struct WeakSignatureResult<'a> {
    chain: &'a [Certificate],
    outcome: Outcome,
    checked: usize,
    weak: Vec<usize>,
}

/// Flag non-root certificates signed with a weak algorithm
pub fn validate_weak_signatures<'a>(
    chain: &'a [Certificate],
    _config: &CheckConfig,
) -> WeakSignatureResult<'a> {
    let mut result = WeakSignatureResult {
        chain,
        outcome: Outcome::success(),
        checked: 0,
        weak: Vec::new(),
    };

    if chain.is_empty() {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(
            "required certificate chain is empty".to_string(),
        ));
        return result;
    }

    let non_roots: Vec<usize> = positions(chain)
        .into_iter()
        .enumerate()
        .filter(|(_, position)| *position != ChainPosition::Root)
        .map(|(index, _)| index)
        .collect();
    result.checked = non_roots.len();
    result.weak = non_roots
        .into_iter()
        .filter(|&i| has_weak_signature(&chain[i]))
        .collect();

    if !result.weak.is_empty() {
        let names = result
            .weak
            .iter()
            .map(|&i| {
                format!(
                    "{:?} ({})",
                    cert_label(&chain[i]),
                    chain[i].signature_algorithm_name()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        result.outcome = Outcome::failure(
            ServiceState::Critical,
            ValidationError::WeakSignature(format!(
                "certs signed with a weak algorithm: {}",
                names
            )),
            PRIORITY_MODIFIER_MAXIMUM,
        );
    }

    tracing::debug!(
        checked = result.checked,
        weak = result.weak.len(),
        "weak signature check"
    );
    result
}

impl ValidationResult for WeakSignatureResult<'_> {
    fn check_name(&self) -> &'static str {
        "weak signature"
    }

    fn keyword(&self) -> Option<ValidationKeyword> {
        None
    }

    fn chain(&self) -> &[Certificate] {
        self.chain
    }

    fn service_state(&self) -> ServiceState {
        self.outcome.state
    }

    fn err(&self) -> Option<&ValidationError> {
        self.outcome.error.as_ref()
    }

    fn is_ignored(&self) -> bool {
        self.outcome.ignored
    }

    fn base_priority(&self) -> i32 {
        BASE_PRIORITY_WEAK_SIGNATURE
    }

    fn priority_modifier(&self) -> i32 {
        self.outcome.priority_modifier
    }

    fn status(&self) -> String {
        let detail = match &self.outcome.error {
            Some(err) => err.to_string(),
            None => "no weak signature algorithms found".to_string(),
        };
        format!("weak signature validation {}; {}", self.outcome.verb(), detail)
    }

    fn report(&self) -> String {
        self.chain
            .iter()
            .enumerate()
            .map(|(i, cert)| {
                let mark = if self.weak.contains(&i) { "WEAK" } else { "OK" };
                format!("{}: {} ({})", mark, cert_label(cert), cert.signature_algorithm_name())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn counters(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("WEAK", self.weak.len()),
            ("OK", self.checked - self.weak.len()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistinguishedName;
    use chrono::Utc;

    fn cert(subject: &str, issuer: &str, algorithm: &str) -> Certificate {
        Certificate {
            subject: DistinguishedName::from_common_name(subject),
            issuer: DistinguishedName::from_common_name(issuer),
            serial: vec![1],
            not_before: Utc::now(),
            not_after: Utc::now(),
            dns_names: vec![],
            ip_addresses: vec![],
            signature_algorithm: algorithm.to_string(),
            signature_digest: None,
            raw_der: vec![],
        }
    }

    #[test]
    fn test_weak_algorithm_detection() {
        assert!(is_weak_signature_algorithm("1.2.840.113549.1.1.5"));
        assert!(is_weak_signature_algorithm("sha1WithRSAEncryption"));
        assert!(is_weak_signature_algorithm("ECDSA-SHA1"));
        assert!(!is_weak_signature_algorithm("1.2.840.113549.1.1.11"));
        assert!(!is_weak_signature_algorithm("SHA256withRSA"));
    }

    #[test]
    fn test_weak_leaf_is_critical() {
        let chain = vec![
            cert("leaf", "root", "1.2.840.113549.1.1.4"),
            cert("root", "root", "1.2.840.113549.1.1.11"),
        ];
        let result = validate_weak_signatures(&chain, &CheckConfig::default());
        assert_eq!(result.service_state(), ServiceState::Critical);
        assert!(matches!(result.err(), Some(ValidationError::WeakSignature(_))));
        assert!(result.status().contains("MD5withRSA"));
    }

    #[test]
    fn test_pss_over_sha1_is_weak() {
        let mut leaf = cert("leaf", "root", "1.2.840.113549.1.1.10");
        leaf.signature_digest = Some("1.3.14.3.2.26".to_string());
        assert!(has_weak_signature(&leaf));

        let chain = vec![leaf, cert("root", "root", "1.2.840.113549.1.1.11")];
        let result = validate_weak_signatures(&chain, &CheckConfig::default());
        assert_eq!(result.service_state(), ServiceState::Critical);
        assert!(result.status().contains("RSA-PSS (SHA1)"));
    }

    #[test]
    fn test_pss_over_sha256_is_accepted() {
        let mut leaf = cert("leaf", "root", "1.2.840.113549.1.1.10");
        leaf.signature_digest = Some("2.16.840.1.101.3.4.2.1".to_string());
        assert!(!has_weak_signature(&leaf));
    }

    #[test]
    fn test_weak_root_is_exempt() {
        let chain = vec![
            cert("leaf", "root", "1.2.840.10045.4.3.2"),
            cert("root", "root", "1.2.840.113549.1.1.5"),
        ];
        let result = validate_weak_signatures(&chain, &CheckConfig::default());
        assert!(result.err().is_none());
        assert_eq!(result.overview(), "[WEAK: 0, OK: 1]");
    }
}
