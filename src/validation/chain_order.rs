//! Chain order check: each certificate must be issued by the next one

use super::{
    cert_label, CheckConfig, Outcome, ValidationKeyword, ValidationResult,
    BASE_PRIORITY_CHAIN_ORDER, PRIORITY_MODIFIER_MINIMUM,
};
use crate::models::{Certificate, ServiceState};
use crate::utils::ValidationError;

/// Why an adjacent pair is out of order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairProblem {
    /// Issuer name of the first does not equal subject name of the second
    IssuerMismatch,
    /// Names line up but the signature does not verify
    SignatureMismatch,
}

/// An adjacent pair `(index, index + 1)` that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MisorderedPair {
    pub index: usize,
    pub problem: PairProblem,
}

#[derive(Debug, Clone)]
pub struct ChainOrderResult<'a> {
    chain: &'a [Certificate],
    outcome: Outcome,
    misordered: Vec<MisorderedPair>,
}

/// Walk adjacent pairs checking issuer names and signatures
pub fn validate_chain_order<'a>(
    chain: &'a [Certificate],
    config: &CheckConfig,
) -> ChainOrderResult<'a> {
    let mut result = ChainOrderResult {
        chain,
        outcome: Outcome::success(),
        misordered: Vec::new(),
    };

    if chain.is_empty() {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(
            "required certificate chain is empty".to_string(),
        ));
        return result.finish(config);
    }

    result.misordered = chain
        .windows(2)
        .enumerate()
        .filter_map(|(index, pair)| {
            let (cert, issuer) = (&pair[0], &pair[1]);
            if cert.issuer != issuer.subject {
                Some(MisorderedPair {
                    index,
                    problem: PairProblem::IssuerMismatch,
                })
            } else if !cert.is_signed_by(issuer) {
                Some(MisorderedPair {
                    index,
                    problem: PairProblem::SignatureMismatch,
                })
            } else {
                None
            }
        })
        .collect();

    if let Some(first) = result.misordered.first() {
        let message = result.describe(first);
        result.outcome = Outcome::failure(
            ServiceState::Warning,
            ValidationError::MisorderedChain(message),
            PRIORITY_MODIFIER_MINIMUM,
        );
    }

    result.finish(config)
}

impl<'a> ChainOrderResult<'a> {
    fn finish(mut self, config: &CheckConfig) -> Self {
        if config.is_ignored(ValidationKeyword::ChainOrder) {
            self.outcome.ignored = true;
        }
        tracing::debug!(
            pairs = self.pairs(),
            misordered = self.misordered.len(),
            ignored = self.outcome.ignored,
            "chain order check"
        );
        self
    }

    fn pairs(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }

    fn describe(&self, pair: &MisorderedPair) -> String {
        let cert = &self.chain[pair.index];
        let next = &self.chain[pair.index + 1];
        match pair.problem {
            PairProblem::IssuerMismatch => format!(
                "cert {} {:?} was issued by {:?}, but cert {} is {:?}",
                pair.index + 1,
                cert_label(cert),
                cert.issuer.display_name(),
                pair.index + 2,
                cert_label(next)
            ),
            PairProblem::SignatureMismatch => format!(
                "signature of cert {} {:?} does not verify with the key of cert {} {:?}",
                pair.index + 1,
                cert_label(cert),
                pair.index + 2,
                cert_label(next)
            ),
        }
    }

    pub fn misordered(&self) -> &[MisorderedPair] {
        &self.misordered
    }
}

impl ValidationResult for ChainOrderResult<'_> {
    fn check_name(&self) -> &'static str {
        "chain order"
    }

    fn keyword(&self) -> Option<ValidationKeyword> {
        Some(ValidationKeyword::ChainOrder)
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
        BASE_PRIORITY_CHAIN_ORDER
    }

    fn priority_modifier(&self) -> i32 {
        self.outcome.priority_modifier
    }

    fn status(&self) -> String {
        let detail = match &self.outcome.error {
            Some(err) => err.to_string(),
            None => format!("{} certs in issuing order", self.chain.len()),
        };
        format!("chain order validation {}; {}", self.outcome.verb(), detail)
    }

    fn report(&self) -> String {
        if self.misordered.is_empty() {
            return "every certificate is issued by the one that follows it".to_string();
        }
        self.misordered
            .iter()
            .map(|pair| self.describe(pair))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn counters(&self) -> Vec<(&'static str, usize)> {
        vec![("PAIRS", self.pairs()), ("MISORDERED", self.misordered.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistinguishedName;
    use chrono::Utc;

    fn cert(subject: &str, issuer: &str) -> Certificate {
        Certificate {
            subject: DistinguishedName::from_common_name(subject),
            issuer: DistinguishedName::from_common_name(issuer),
            serial: vec![1],
            not_before: Utc::now(),
            not_after: Utc::now(),
            dns_names: vec![],
            ip_addresses: vec![],
            signature_algorithm: String::new(),
            signature_digest: None,
            raw_der: vec![],
        }
    }

    #[test]
    fn test_issuer_mismatch_warns() {
        let chain = vec![cert("leaf", "inter"), cert("root", "root"), cert("inter", "root")];
        let result = validate_chain_order(&chain, &CheckConfig::default());
        assert_eq!(result.service_state(), ServiceState::Warning);
        assert_eq!(result.priority_modifier(), PRIORITY_MODIFIER_MINIMUM);
        assert_eq!(result.misordered()[0].problem, PairProblem::IssuerMismatch);
        assert!(matches!(result.err(), Some(ValidationError::MisorderedChain(_))));
    }

    #[test]
    fn test_names_without_signatures_do_not_verify() {
        let chain = vec![cert("leaf", "inter"), cert("inter", "root")];
        let result = validate_chain_order(&chain, &CheckConfig::default());
        assert_eq!(result.misordered()[0].problem, PairProblem::SignatureMismatch);
    }

    #[test]
    fn test_single_cert_is_in_order() {
        let chain = vec![cert("leaf", "inter")];
        let result = validate_chain_order(&chain, &CheckConfig::default());
        assert!(result.err().is_none());
        assert_eq!(result.overview(), "[PAIRS: 0, MISORDERED: 0]");
    }

    #[test]
    fn test_empty_chain_is_missing_value() {
        let result = validate_chain_order(&[], &CheckConfig::default());
        assert_eq!(result.service_state(), ServiceState::Unknown);
    }
}
