//! Root presence check: servers should not send their root certificate

use super::{
    cert_label, CheckConfig, Outcome, ValidationKeyword, ValidationResult, BASE_PRIORITY_ROOT,
    PRIORITY_MODIFIER_MINIMUM,
};
use crate::certificate::chain::{positions, ChainPosition};
use crate::models::{Certificate, ServiceState};
use crate::utils::ValidationError;

#[derive(Debug, Clone)]
pub struct RootResult<'a> {
    chain: &'a [Certificate],
    outcome: Outcome,
    roots: Vec<usize>,
}

/// Warn when any certificate of the chain is classified as a root
pub fn validate_root<'a>(chain: &'a [Certificate], config: &CheckConfig) -> RootResult<'a> {
    let mut result = RootResult {
        chain,
        outcome: Outcome::success(),
        roots: Vec::new(),
    };

    if chain.is_empty() {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(
            "required certificate chain is empty".to_string(),
        ));
        return result.finish(config);
    }

    result.roots = positions(chain)
        .into_iter()
        .enumerate()
        .filter(|(_, position)| *position == ChainPosition::Root)
        .map(|(index, _)| index)
        .collect();

    if let Some(&index) = result.roots.first() {
        result.outcome = Outcome::failure(
            ServiceState::Warning,
            ValidationError::RootPresentInChain(format!(
                "root cert {:?} found at position {} of {}",
                cert_label(&chain[index]),
                index + 1,
                chain.len()
            )),
            PRIORITY_MODIFIER_MINIMUM,
        );
    }

    result.finish(config)
}

impl<'a> RootResult<'a> {
    fn finish(mut self, config: &CheckConfig) -> Self {
        if config.is_ignored(ValidationKeyword::Root) {
            self.outcome.ignored = true;
        }
        tracing::debug!(
            roots = self.roots.len(),
            ignored = self.outcome.ignored,
            "root check"
        );
        self
    }
}

impl ValidationResult for RootResult<'_> {
    fn check_name(&self) -> &'static str {
        "root"
    }

    fn keyword(&self) -> Option<ValidationKeyword> {
        Some(ValidationKeyword::Root)
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
        BASE_PRIORITY_ROOT
    }

    fn priority_modifier(&self) -> i32 {
        self.outcome.priority_modifier
    }

    fn status(&self) -> String {
        let detail = match &self.outcome.error {
            Some(err) => err.to_string(),
            None => "no root cert found in chain".to_string(),
        };
        format!("root validation {}; {}", self.outcome.verb(), detail)
    }

    fn report(&self) -> String {
        if self.roots.is_empty() {
            return "no root certificates presented".to_string();
        }
        self.roots
            .iter()
            .map(|&i| format!("root cert at position {}: {}", i + 1, self.chain[i].subject))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn counters(&self) -> Vec<(&'static str, usize)> {
        vec![("ROOTS", self.roots.len())]
    }
}
