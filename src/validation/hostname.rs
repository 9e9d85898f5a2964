//! Hostname check: the leaf's SANs must cover the name being monitored

use super::{
    cert_label, CheckConfig, Outcome, ValidationKeyword, ValidationResult,
    BASE_PRIORITY_HOSTNAME, PRIORITY_MODIFIER_MAXIMUM,
};
use crate::certificate::{chain::leaf_index, hostname::verify_hostname};
use crate::models::{Certificate, ServiceState};
use crate::utils::ValidationError;

/// Result of verifying the monitored name against the leaf certificate
#[derive(Debug, Clone)]
pub struct HostnameResult<'a> {
    chain: &'a [Certificate],
    outcome: Outcome,
    hostname: String,
    leaf_index: Option<usize>,
    sans_entries: usize,
    matched: bool,
    note: Option<String>,
}

/// Verify the configured DNS name (or the server name) against the leaf.
///
/// Only SANs entries are consulted; the subject Common Name is not.
pub fn validate_hostname<'a>(chain: &'a [Certificate], config: &CheckConfig) -> HostnameResult<'a> {
    let hostname = config.hostname_to_verify().to_string();
    let mut result = HostnameResult {
        chain,
        outcome: Outcome::success(),
        hostname,
        leaf_index: None,
        sans_entries: 0,
        matched: false,
        note: None,
    };

    if chain.is_empty() {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(
            "required certificate chain is empty".to_string(),
        ));
        return result.finish(config);
    }

    // A chain read from a file has no name to verify unless one is given.
    // Only an explicit request for the check makes that an input error.
    if result.hostname.is_empty() {
        if config.keywords.is_requested(ValidationKeyword::Hostname) {
            result.outcome = Outcome::input_error(ValidationError::MissingValue(
                "no server name or DNS name provided for hostname verification".to_string(),
            ));
        } else {
            result.note = Some(
                "no server name or DNS name provided; hostname verification skipped".to_string(),
            );
            result.outcome = Outcome::success().ignore();
        }
        return result.finish(config);
    }

    let Some(leaf_index) = leaf_index(chain) else {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(
            "no leaf certificate found in chain".to_string(),
        ));
        return result.finish(config);
    };
    result.leaf_index = Some(leaf_index);

    let leaf = &chain[leaf_index];
    result.sans_entries = leaf.dns_names.len() + leaf.ip_addresses.len();

    if result.sans_entries == 0 {
        if config.ignore_hostname_if_empty_sans {
            result.note = Some(format!(
                "leaf cert {:?} has no SANs entries; hostname verification skipped",
                cert_label(leaf)
            ));
            result.outcome = Outcome::success().ignore();
        } else {
            result.outcome = Outcome::failure(
                ServiceState::Critical,
                ValidationError::HostnameMismatch(format!(
                    "leaf cert {:?} has no SANs entries; {:?} cannot be verified",
                    cert_label(leaf),
                    result.hostname
                )),
                PRIORITY_MODIFIER_MAXIMUM,
            );
        }
        return result.finish(config);
    }

    result.matched = verify_hostname(leaf, &result.hostname);
    if !result.matched {
        result.outcome = Outcome::failure(
            ServiceState::Critical,
            ValidationError::HostnameMismatch(format!(
                "{:?} does not match any SANs entry of leaf cert {:?}",
                result.hostname,
                cert_label(leaf)
            )),
            PRIORITY_MODIFIER_MAXIMUM,
        );
    }

    result.finish(config)
}

impl<'a> HostnameResult<'a> {
    fn finish(mut self, config: &CheckConfig) -> Self {
        if config.is_ignored(ValidationKeyword::Hostname) {
            self.outcome.ignored = true;
        }
        tracing::debug!(
            hostname = %self.hostname,
            matched = self.matched,
            ignored = self.outcome.ignored,
            "hostname check"
        );
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn matched(&self) -> bool {
        self.matched
    }

    fn leaf(&self) -> Option<&Certificate> {
        self.leaf_index.map(|i| &self.chain[i])
    }
}

impl ValidationResult for HostnameResult<'_> {
    fn check_name(&self) -> &'static str {
        "hostname"
    }

    fn keyword(&self) -> Option<ValidationKeyword> {
        Some(ValidationKeyword::Hostname)
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
        BASE_PRIORITY_HOSTNAME
    }

    fn priority_modifier(&self) -> i32 {
        self.outcome.priority_modifier
    }

    fn status(&self) -> String {
        let detail = match (&self.outcome.error, &self.note) {
            (Some(err), _) => err.to_string(),
            (None, Some(note)) => note.clone(),
            (None, None) => format!("{:?} matches leaf cert SANs", self.hostname),
        };
        format!("hostname validation {}; {}", self.outcome.verb(), detail)
    }

    fn report(&self) -> String {
        let mut lines = vec![format!("Hostname: {}", self.hostname)];
        if let Some(leaf) = self.leaf() {
            lines.push(format!("Leaf cert: {}", leaf.subject));
            let mut entries: Vec<String> = leaf.dns_names.clone();
            entries.extend(leaf.ip_addresses.iter().map(|ip| ip.to_string()));
            lines.push(format!("SANs entries: {}", entries.join(", ")));
        }
        lines.push(format!("Matched: {}", if self.matched { "yes" } else { "no" }));
        lines.join("\n")
    }

    fn counters(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("SANS", self.sans_entries),
            ("MATCHED", usize::from(self.matched)),
        ]
    }
}
