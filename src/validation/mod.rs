//! Certificate chain validation
//!
//! Each check is a pure function of the chain plus a [`CheckConfig`] and
//! produces a value implementing [`ValidationResult`]. The checks share a
//! capability contract but keep their own state; [`ValidationResults`]
//! reduces them to one verdict.

pub mod chain_order;
pub mod expiration;
pub mod hostname;
pub mod options;
pub mod results;
pub mod root;
pub mod sans;
pub mod signature;

pub use chain_order::ChainOrderResult;
pub use expiration::ExpirationResult;
pub use hostname::HostnameResult;
pub use options::{CheckConfig, ValidationKeyword, ValidationKeywords};
pub use results::ValidationResults;
pub use root::RootResult;
pub use sans::SansResult;
pub use signature::WeakSignatureResult;

use crate::models::{Certificate, ServiceState};
use crate::utils::ValidationError;

/// Priority modifier for conditions that must win the status line
pub const PRIORITY_MODIFIER_MAXIMUM: i32 = 100;
/// Priority modifier for notable but non-fatal conditions
pub const PRIORITY_MODIFIER_MEDIUM: i32 = 50;
/// Priority modifier for advisory conditions
pub const PRIORITY_MODIFIER_MINIMUM: i32 = 1;
/// Priority modifier for a passing check
pub const PRIORITY_MODIFIER_BASELINE: i32 = 0;

pub const BASE_PRIORITY_EXPIRATION: i32 = 6;
pub const BASE_PRIORITY_HOSTNAME: i32 = 5;
pub const BASE_PRIORITY_SANS: i32 = 4;
pub const BASE_PRIORITY_WEAK_SIGNATURE: i32 = 3;
pub const BASE_PRIORITY_CHAIN_ORDER: i32 = 2;
pub const BASE_PRIORITY_ROOT: i32 = 1;

/// Capability set shared by every validation check result
pub trait ValidationResult {
    /// Human name, used as the first word of the status line
    fn check_name(&self) -> &'static str;

    /// Apply/ignore keyword controlling this check, if any
    fn keyword(&self) -> Option<ValidationKeyword>;

    /// The chain that was evaluated
    fn chain(&self) -> &[Certificate];

    /// State contributed to the overall verdict when not ignored
    fn service_state(&self) -> ServiceState;

    /// Failure condition, absent on success
    fn err(&self) -> Option<&ValidationError>;

    fn is_ignored(&self) -> bool;

    fn base_priority(&self) -> i32;

    fn priority_modifier(&self) -> i32;

    fn priority(&self) -> i32 {
        self.base_priority() + self.priority_modifier()
    }

    /// One-line status without the state label
    fn status(&self) -> String;

    /// Bracketed counters, e.g. `[EXPIRED: 0, EXPIRING: 1, OK: 2]`
    fn overview(&self) -> String {
        let counters = self
            .counters()
            .into_iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{}]", counters)
    }

    /// Multi-line detail for the DETAILED INFO section
    fn report(&self) -> String;

    /// Named check-specific counters
    fn counters(&self) -> Vec<(&'static str, usize)>;
}

/// Outcome fields every check tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub state: ServiceState,
    pub error: Option<ValidationError>,
    pub ignored: bool,
    pub priority_modifier: i32,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            state: ServiceState::Ok,
            error: None,
            ignored: false,
            priority_modifier: PRIORITY_MODIFIER_BASELINE,
        }
    }

    pub fn failure(state: ServiceState, error: ValidationError, priority_modifier: i32) -> Self {
        Self {
            state,
            error: Some(error),
            ignored: false,
            priority_modifier,
        }
    }

    /// Input problems are reported as UNKNOWN and always take the lead
    pub fn input_error(error: ValidationError) -> Self {
        Self::failure(ServiceState::Unknown, error, PRIORITY_MODIFIER_MAXIMUM)
    }

    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// `successful`, `failed` or `ignored` for status lines
    pub fn verb(&self) -> &'static str {
        if self.ignored {
            "ignored"
        } else if self.error.is_some() {
            "failed"
        } else {
            "successful"
        }
    }
}

/// Run every applied check in insertion order
pub fn validate_chain<'a>(chain: &'a [Certificate], config: &CheckConfig) -> ValidationResults<'a> {
    let mut results = ValidationResults::new();

    if config.is_applied(ValidationKeyword::Expiration) {
        results.add(expiration::validate_expiration(chain, config));
    }
    if config.is_applied(ValidationKeyword::Hostname) {
        results.add(hostname::validate_hostname(chain, config));
    }
    if config.is_applied(ValidationKeyword::Sans) {
        results.add(sans::validate_sans(chain, config));
    }
    results.add(signature::validate_weak_signatures(chain, config));
    if config.is_applied(ValidationKeyword::ChainOrder) {
        results.add(chain_order::validate_chain_order(chain, config));
    }
    if config.is_applied(ValidationKeyword::Root) {
        results.add(root::validate_root(chain, config));
    }

    tracing::debug!(
        checks = results.len(),
        state = %results.service_state(),
        "validation complete"
    );
    results
}

/// Display name for a certificate in status lines
pub(crate) fn cert_label(cert: &Certificate) -> &str {
    cert.subject.display_name()
}

/// Indent every line of `text` by two spaces
pub(crate) fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
