//! Validation result collection
//!
//! Reduces the individual check results to one service state, one lead
//! result for the status line and an ordered detail listing.

use super::{indent, ValidationResult};
use crate::models::ServiceState;
use crate::utils::ValidationError;

/// Ordered collection of check results for one chain
#[derive(Default)]
pub struct ValidationResults<'a> {
    results: Vec<Box<dyn ValidationResult + 'a>>,
}

impl<'a> ValidationResults<'a> {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Append a result, keeping insertion order
    pub fn add(&mut self, result: impl ValidationResult + 'a) {
        self.results.push(Box::new(result));
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn ValidationResult + 'a)> {
        self.results.iter().map(|r| r.as_ref())
    }

    fn counted(&self) -> impl Iterator<Item = &(dyn ValidationResult + 'a)> {
        self.iter().filter(|r| !r.is_ignored())
    }

    /// Most severe state among results that are not ignored, OK when none count
    pub fn service_state(&self) -> ServiceState {
        self.counted()
            .map(|r| r.service_state())
            .fold(ServiceState::Ok, ServiceState::max)
    }

    /// Highest-priority counted result at the overall state.
    ///
    /// Ties go to the earliest inserted result.
    pub fn lead(&self) -> Option<&(dyn ValidationResult + 'a)> {
        let state = self.service_state();
        let mut lead: Option<&(dyn ValidationResult + 'a)> = None;
        for result in self.counted().filter(|r| r.service_state() == state) {
            match lead {
                Some(current) if current.priority() >= result.priority() => {}
                _ => lead = Some(result),
            }
        }
        lead
    }

    /// `<STATE>: <status> <overview>` for the first output line
    pub fn service_output(&self) -> String {
        let state = self.service_state();
        match self.lead() {
            Some(lead) => format!("{}: {} {}", state.label(), lead.status(), lead.overview()),
            None if self.results.is_empty() => {
                format!("{}: no validation checks performed", state.label())
            }
            None => format!(
                "{}: all {} validation checks ignored",
                state.label(),
                self.results.len()
            ),
        }
    }

    /// Failures of counted results, in insertion order
    pub fn errors(&self) -> Vec<&ValidationError> {
        self.counted().filter_map(|r| r.err()).collect()
    }

    /// Whether any counted result failed
    pub fn has_failures(&self) -> bool {
        self.counted().any(|r| r.err().is_some())
    }

    /// Every result in insertion order, ignored ones marked
    pub fn detail_listing(&self) -> String {
        self.iter()
            .map(|r| {
                let marker = if r.is_ignored() { "[IGNORED] " } else { "" };
                let mut block = format!(
                    "{}{}: {} {}",
                    marker,
                    r.service_state().label(),
                    r.status(),
                    r.overview()
                );
                let report = r.report();
                if !report.trim().is_empty() {
                    block.push('\n');
                    block.push_str(&indent(&report));
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl std::fmt::Debug for ValidationResults<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|r| (r.check_name(), r.service_state(), r.is_ignored())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Certificate;
    use crate::validation::{
        ValidationKeyword, PRIORITY_MODIFIER_BASELINE, PRIORITY_MODIFIER_MAXIMUM,
        PRIORITY_MODIFIER_MINIMUM,
    };

    struct Fake {
        name: &'static str,
        state: ServiceState,
        error: Option<ValidationError>,
        ignored: bool,
        base: i32,
        modifier: i32,
    }

    impl Fake {
        fn new(name: &'static str, state: ServiceState, base: i32, modifier: i32) -> Self {
            let error = (state != ServiceState::Ok)
                .then(|| ValidationError::RootPresentInChain(name.to_string()));
            Self {
                name,
                state,
                error,
                ignored: false,
                base,
                modifier,
            }
        }

        fn ignored(mut self) -> Self {
            self.ignored = true;
            self
        }
    }

    impl ValidationResult for Fake {
        fn check_name(&self) -> &'static str {
            self.name
        }
        fn keyword(&self) -> Option<ValidationKeyword> {
            None
        }
        fn chain(&self) -> &[Certificate] {
            &[]
        }
        fn service_state(&self) -> ServiceState {
            self.state
        }
        fn err(&self) -> Option<&ValidationError> {
            self.error.as_ref()
        }
        fn is_ignored(&self) -> bool {
            self.ignored
        }
        fn base_priority(&self) -> i32 {
            self.base
        }
        fn priority_modifier(&self) -> i32 {
            self.modifier
        }
        fn status(&self) -> String {
            format!("{} status", self.name)
        }
        fn report(&self) -> String {
            String::new()
        }
        fn counters(&self) -> Vec<(&'static str, usize)> {
            vec![("N", 1)]
        }
    }

    #[test]
    fn test_state_is_max_of_counted_results() {
        let mut results = ValidationResults::new();
        results.add(Fake::new("a", ServiceState::Warning, 1, PRIORITY_MODIFIER_MINIMUM));
        results.add(Fake::new("b", ServiceState::Critical, 2, PRIORITY_MODIFIER_MAXIMUM).ignored());
        results.add(Fake::new("c", ServiceState::Ok, 3, PRIORITY_MODIFIER_BASELINE));
        assert_eq!(results.service_state(), ServiceState::Warning);
        assert_eq!(results.lead().map(|r| r.check_name()), Some("a"));
        assert_eq!(results.errors().len(), 1);
    }

    #[test]
    fn test_unknown_outranks_critical() {
        let mut results = ValidationResults::new();
        results.add(Fake::new("crit", ServiceState::Critical, 5, PRIORITY_MODIFIER_MAXIMUM));
        results.add(Fake::new("unk", ServiceState::Unknown, 1, PRIORITY_MODIFIER_MAXIMUM));
        assert_eq!(results.service_state(), ServiceState::Unknown);
        assert_eq!(results.lead().map(|r| r.check_name()), Some("unk"));
    }

    #[test]
    fn test_lead_prefers_priority_then_insertion() {
        let mut results = ValidationResults::new();
        results.add(Fake::new("low", ServiceState::Critical, 3, PRIORITY_MODIFIER_MAXIMUM));
        results.add(Fake::new("high", ServiceState::Critical, 5, PRIORITY_MODIFIER_MAXIMUM));
        results.add(Fake::new("tie", ServiceState::Critical, 5, PRIORITY_MODIFIER_MAXIMUM));
        assert_eq!(results.lead().map(|r| r.check_name()), Some("high"));
        assert_eq!(results.service_output(), "CRITICAL: high status [N: 1]");
    }

    #[test]
    fn test_all_ignored_is_ok() {
        let mut results = ValidationResults::new();
        results.add(Fake::new("a", ServiceState::Critical, 1, PRIORITY_MODIFIER_MAXIMUM).ignored());
        assert_eq!(results.service_state(), ServiceState::Ok);
        assert!(results.lead().is_none());
        assert_eq!(results.service_output(), "OK: all 1 validation checks ignored");
    }

    #[test]
    fn test_detail_listing_preserves_order_and_marks_ignored() {
        let mut results = ValidationResults::new();
        results.add(Fake::new("first", ServiceState::Ok, 1, 0));
        results.add(Fake::new("second", ServiceState::Warning, 1, 1).ignored());
        let listing = results.detail_listing();
        let first = listing.find("first status").unwrap();
        let second = listing.find("[IGNORED] WARNING: second status").unwrap();
        assert!(first < second);
    }
}
