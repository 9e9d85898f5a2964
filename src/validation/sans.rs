//! SANs list check: every requested entry must be present on the leaf

use super::options::SKIP_SANS_CHECKS_KEYWORD;
use super::{
    cert_label, CheckConfig, Outcome, ValidationKeyword, ValidationResult, BASE_PRIORITY_SANS,
    PRIORITY_MODIFIER_MAXIMUM,
};
use crate::certificate::chain::leaf_index;
use crate::models::{Certificate, ServiceState};
use crate::utils::ValidationError;

/// Result of comparing requested SANs entries with the leaf certificate
#[derive(Debug, Clone)]
pub struct SansResult<'a> {
    chain: &'a [Certificate],
    outcome: Outcome,
    requested: Vec<String>,
    matched: Vec<String>,
    missing: Vec<String>,
    extra: Vec<String>,
    note: Option<String>,
}

/// Check that the leaf carries every requested SANs entry.
///
/// Entries present on the certificate but not requested are reported, they
/// do not fail the check.
pub fn validate_sans<'a>(chain: &'a [Certificate], config: &CheckConfig) -> SansResult<'a> {
    let requested = config.requested_sans();
    let mut result = SansResult {
        chain,
        outcome: Outcome::success(),
        requested,
        matched: Vec::new(),
        missing: Vec::new(),
        extra: Vec::new(),
        note: None,
    };

    if chain.is_empty() {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(
            "required certificate chain is empty".to_string(),
        ));
        return result.finish(config);
    }

    let skip = result
        .requested
        .first()
        .is_some_and(|first| first.eq_ignore_ascii_case(SKIP_SANS_CHECKS_KEYWORD));
    if skip {
        result.note = Some(format!(
            "{} keyword provided; SANs entries not checked",
            SKIP_SANS_CHECKS_KEYWORD
        ));
        result.outcome = Outcome::success().ignore();
        return result.finish(config);
    }

    if result.requested.is_empty() {
        result.note = Some("no SANs entries requested".to_string());
        result.outcome = Outcome::success().ignore();
        return result.finish(config);
    }

    let Some(index) = leaf_index(chain) else {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(
            "no leaf certificate found in chain".to_string(),
        ));
        return result.finish(config);
    };

    let leaf = &chain[index];
    let present: Vec<String> = leaf
        .dns_names
        .iter()
        .cloned()
        .chain(leaf.ip_addresses.iter().map(|ip| ip.to_string()))
        .collect();

    let contains = |list: &[String], wanted: &str| -> bool {
        list.iter().any(|entry| {
            entry
                .trim_end_matches('.')
                .eq_ignore_ascii_case(wanted.trim_end_matches('.'))
        })
    };

    for wanted in &result.requested {
        if contains(present.as_slice(), wanted.as_str()) {
            result.matched.push(wanted.clone());
        } else {
            result.missing.push(wanted.clone());
        }
    }
    result.extra = present
        .iter()
        .filter(|entry| !contains(result.requested.as_slice(), entry.as_str()))
        .cloned()
        .collect();

    if !result.missing.is_empty() {
        result.outcome = Outcome::failure(
            ServiceState::Critical,
            ValidationError::SansMismatch(format!(
                "leaf cert {:?} is missing requested SANs entries: {}",
                cert_label(leaf),
                result.missing.join(", ")
            )),
            PRIORITY_MODIFIER_MAXIMUM,
        );
    }

    result.finish(config)
}

impl<'a> SansResult<'a> {
    fn finish(mut self, config: &CheckConfig) -> Self {
        if config.is_ignored(ValidationKeyword::Sans) {
            self.outcome.ignored = true;
        }
        tracing::debug!(
            requested = self.requested.len(),
            matched = self.matched.len(),
            missing = self.missing.len(),
            ignored = self.outcome.ignored,
            "sans check"
        );
        self
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn extra(&self) -> &[String] {
        &self.extra
    }
}

impl ValidationResult for SansResult<'_> {
    fn check_name(&self) -> &'static str {
        "sans"
    }

    fn keyword(&self) -> Option<ValidationKeyword> {
        Some(ValidationKeyword::Sans)
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
        BASE_PRIORITY_SANS
    }

    fn priority_modifier(&self) -> i32 {
        self.outcome.priority_modifier
    }

    fn status(&self) -> String {
        let detail = match (&self.outcome.error, &self.note) {
            (Some(err), _) => err.to_string(),
            (None, Some(note)) => note.clone(),
            (None, None) => format!(
                "{} of {} requested SANs entries present on leaf cert",
                self.matched.len(),
                self.requested.len()
            ),
        };
        format!("SANs validation {}; {}", self.outcome.verb(), detail)
    }

    fn report(&self) -> String {
        let list = |entries: &[String]| {
            if entries.is_empty() {
                "none".to_string()
            } else {
                entries.join(", ")
            }
        };
        [
            format!("Requested: {}", list(&self.requested)),
            format!("Found: {}", list(&self.matched)),
            format!("Missing: {}", list(&self.missing)),
            format!("Extra: {}", list(&self.extra)),
        ]
        .join("\n")
    }

    fn counters(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("REQUESTED", self.requested.len()),
            ("FOUND", self.matched.len()),
            ("MISSING", self.missing.len()),
            ("EXTRA", self.extra.len()),
        ]
    }
}
