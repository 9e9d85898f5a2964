//! Expiration check
//!
//! Conditions are evaluated in a fixed precedence order and the first one
//! that holds decides the state. Position-scoped ignore flags suppress a
//! condition; when only suppressed conditions hold the result is ignored
//! but its counters still describe the chain.

use super::{
    cert_label, indent, CheckConfig, Outcome, ValidationKeyword, ValidationResult,
    BASE_PRIORITY_EXPIRATION, PRIORITY_MODIFIER_MAXIMUM, PRIORITY_MODIFIER_MEDIUM,
    PRIORITY_MODIFIER_MINIMUM,
};
use crate::certificate::chain::{self, ChainPosition};
use crate::models::{Certificate, ServiceState};
use crate::utils::ValidationError;
use chrono::{DateTime, Duration, Utc};

/// Expiration status of one certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationStatus {
    Expired,
    Expiring,
    Valid,
}

/// Per-certificate facts recorded by the check
#[derive(Debug, Clone)]
pub struct CertExpiration {
    pub index: usize,
    pub position: ChainPosition,
    pub status: ExpirationStatus,
    /// Below the critical threshold (and not yet expired)
    pub below_critical: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    ExpiredLeaf,
    ExpiringLeaf,
    ExpiringIntermediate,
    ExpiringRoot,
    ExpiredIntermediate,
    ExpiredRoot,
}

impl Condition {
    /// Descending precedence
    const ORDER: [Condition; 6] = [
        Condition::ExpiredLeaf,
        Condition::ExpiringLeaf,
        Condition::ExpiringIntermediate,
        Condition::ExpiringRoot,
        Condition::ExpiredIntermediate,
        Condition::ExpiredRoot,
    ];

    fn position_matches(&self, position: ChainPosition) -> bool {
        match self {
            Condition::ExpiredLeaf | Condition::ExpiringLeaf => position.is_leaf(),
            Condition::ExpiringIntermediate | Condition::ExpiredIntermediate => {
                position == ChainPosition::Intermediate
            }
            Condition::ExpiringRoot | Condition::ExpiredRoot => position == ChainPosition::Root,
        }
    }

    fn status(&self) -> ExpirationStatus {
        match self {
            Condition::ExpiredLeaf | Condition::ExpiredIntermediate | Condition::ExpiredRoot => {
                ExpirationStatus::Expired
            }
            _ => ExpirationStatus::Expiring,
        }
    }

    fn suppressed(&self, config: &CheckConfig) -> bool {
        match self {
            Condition::ExpiredLeaf | Condition::ExpiringLeaf => false,
            Condition::ExpiringIntermediate => config.ignore_expiring_intermediate,
            Condition::ExpiringRoot => config.ignore_expiring_root,
            Condition::ExpiredIntermediate => config.ignore_expired_intermediate,
            Condition::ExpiredRoot => config.ignore_expired_root,
        }
    }

    fn state_and_modifier(&self) -> (ServiceState, i32) {
        match self {
            Condition::ExpiredLeaf => (ServiceState::Critical, PRIORITY_MODIFIER_MAXIMUM),
            Condition::ExpiredIntermediate => (ServiceState::Critical, PRIORITY_MODIFIER_MEDIUM),
            Condition::ExpiringLeaf
            | Condition::ExpiringIntermediate
            | Condition::ExpiringRoot
            | Condition::ExpiredRoot => (ServiceState::Warning, PRIORITY_MODIFIER_MINIMUM),
        }
    }
}

/// Result of the expiration check
#[derive(Debug, Clone)]
pub struct ExpirationResult<'a> {
    chain: &'a [Certificate],
    outcome: Outcome,
    now: DateTime<Utc>,
    age_warning: u32,
    age_critical: u32,
    verbose: bool,
    certs: Vec<CertExpiration>,
    /// Certificate named in the status line
    subject_index: Option<usize>,
}

/// Evaluate expiration of every certificate against the configured thresholds
pub fn validate_expiration<'a>(
    chain: &'a [Certificate],
    config: &CheckConfig,
) -> ExpirationResult<'a> {
    let mut result = ExpirationResult {
        chain,
        outcome: Outcome::success(),
        now: config.now,
        age_warning: config.age_warning,
        age_critical: config.age_critical,
        verbose: config.verbose,
        certs: Vec::new(),
        subject_index: None,
    };

    if chain.is_empty() {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(
            "required certificate chain is empty".to_string(),
        ));
        return result.finish(config);
    }

    if config.age_warning == 0 || config.age_critical == 0 {
        result.outcome = Outcome::input_error(ValidationError::MissingValue(format!(
            "expiration thresholds must be non-zero (warning: {}, critical: {})",
            config.age_warning, config.age_critical
        )));
        return result.finish(config);
    }

    if config.age_critical > config.age_warning {
        result.outcome = Outcome::input_error(ValidationError::InvalidInput(format!(
            "critical threshold ({} days) is greater than warning threshold ({} days)",
            config.age_critical, config.age_warning
        )));
        return result.finish(config);
    }

    let now = config.now;
    let warning_at = now + Duration::days(i64::from(config.age_warning));
    let critical_at = now + Duration::days(i64::from(config.age_critical));

    result.certs = chain::positions(chain)
        .into_iter()
        .enumerate()
        .map(|(index, position)| {
            let cert = &chain[index];
            let status = if cert.is_expired(now) {
                ExpirationStatus::Expired
            } else if cert.is_expiring(now, warning_at) {
                ExpirationStatus::Expiring
            } else {
                ExpirationStatus::Valid
            };
            CertExpiration {
                index,
                position,
                status,
                below_critical: cert.is_expiring(now, critical_at),
            }
        })
        .collect();

    let mut suppressed: Option<Condition> = None;
    let mut winner: Option<Condition> = None;
    for condition in Condition::ORDER {
        if result.first_matching(condition).is_none() {
            continue;
        }
        if condition.suppressed(config) {
            suppressed.get_or_insert(condition);
            continue;
        }
        winner = Some(condition);
        break;
    }

    match (winner, suppressed) {
        (Some(condition), _) => {
            result.subject_index = result.first_matching(condition);
            let (state, modifier) = condition.state_and_modifier();
            result.outcome = Outcome::failure(state, result.condition_error(condition), modifier);
        }
        (None, Some(condition)) => {
            result.subject_index = result.first_matching(condition);
            let (state, modifier) = condition.state_and_modifier();
            result.outcome =
                Outcome::failure(state, result.condition_error(condition), modifier).ignore();
        }
        (None, None) => {
            result.subject_index = chain::next_to_expire(chain);
        }
    }

    result.finish(config)
}

impl<'a> ExpirationResult<'a> {
    fn finish(mut self, config: &CheckConfig) -> Self {
        if config.is_ignored(ValidationKeyword::Expiration) {
            self.outcome.ignored = true;
        }
        tracing::debug!(
            expired = self.num_expired(),
            expiring = self.num_expiring(),
            state = %self.outcome.state,
            ignored = self.outcome.ignored,
            "expiration check"
        );
        self
    }

    /// Soonest-expiring certificate that satisfies `condition`
    fn first_matching(&self, condition: Condition) -> Option<usize> {
        self.certs
            .iter()
            .filter(|c| condition.position_matches(c.position) && c.status == condition.status())
            .min_by_key(|c| (self.chain[c.index].not_after, c.index))
            .map(|c| c.index)
    }

    fn condition_error(&self, condition: Condition) -> ValidationError {
        let detail = match self.first_matching(condition) {
            Some(index) => self.describe(index),
            None => String::new(),
        };
        match condition.status() {
            ExpirationStatus::Expired => ValidationError::ExpiredCertFound(detail),
            _ => ValidationError::ExpiringCertFound(detail),
        }
    }

    /// `leaf cert "name" expires next in 22d (until 2025-04-01 00:00:00 UTC)`
    fn describe(&self, index: usize) -> String {
        let cert = &self.chain[index];
        let position = self
            .certs
            .get(index)
            .map(|c| c.position)
            .unwrap_or_else(|| chain::classify(self.chain, index));
        let remaining = cert.time_remaining(self.now);
        let when = if remaining < Duration::zero() {
            format!("expired {} ago", format_duration(-remaining))
        } else {
            format!("expires next in {}", format_duration(remaining))
        };
        format!(
            "{} cert {:?} {} ({} {})",
            position,
            cert_label(cert),
            when,
            if remaining < Duration::zero() { "on" } else { "until" },
            cert.not_after.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    pub fn num_expired(&self) -> usize {
        self.count(ExpirationStatus::Expired)
    }

    pub fn num_expiring(&self) -> usize {
        self.count(ExpirationStatus::Expiring)
    }

    pub fn num_valid(&self) -> usize {
        self.count(ExpirationStatus::Valid)
    }

    fn count(&self, status: ExpirationStatus) -> usize {
        self.certs.iter().filter(|c| c.status == status).count()
    }

    pub fn certs(&self) -> &[CertExpiration] {
        &self.certs
    }
}

/// `90d`, `22d 4h`, or `5h` below one day
fn format_duration(duration: Duration) -> String {
    let days = duration.num_days();
    let hours = duration.num_hours() - days * 24;
    match (days, hours) {
        (0, h) => format!("{}h", h),
        (d, 0) => format!("{}d", d),
        (d, h) => format!("{}d {}h", d, h),
    }
}

impl ValidationResult for ExpirationResult<'_> {
    fn check_name(&self) -> &'static str {
        "expiration"
    }

    fn keyword(&self) -> Option<ValidationKeyword> {
        Some(ValidationKeyword::Expiration)
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
        BASE_PRIORITY_EXPIRATION
    }

    fn priority_modifier(&self) -> i32 {
        self.outcome.priority_modifier
    }

    fn status(&self) -> String {
        let detail = match (&self.outcome.error, self.subject_index) {
            (Some(err), _) if err.is_input_error() => err.to_string(),
            (_, Some(index)) => self.describe(index),
            (Some(err), None) => err.to_string(),
            (None, None) => "no certificates evaluated".to_string(),
        };
        format!("expiration validation {}; {}", self.outcome.verb(), detail)
    }

    fn report(&self) -> String {
        let mut lines = vec![format!(
            "Thresholds: WARNING {} days, CRITICAL {} days",
            self.age_warning, self.age_critical
        )];
        for cert in &self.certs {
            if !self.verbose && cert.status == ExpirationStatus::Valid {
                continue;
            }
            let label = match (cert.status, cert.below_critical) {
                (ExpirationStatus::Expired, _) => "EXPIRED",
                (ExpirationStatus::Expiring, true) => "EXPIRING (below critical threshold)",
                (ExpirationStatus::Expiring, false) => "EXPIRING",
                (ExpirationStatus::Valid, _) => "OK",
            };
            lines.push(format!("{}: {}", label, self.describe(cert.index)));
        }
        if !self.verbose && self.num_expired() + self.num_expiring() == 0 && !self.certs.is_empty()
        {
            lines.push(indent("all certificates valid beyond the warning threshold"));
        }
        lines.join("\n")
    }

    fn counters(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("EXPIRED", self.num_expired()),
            ("EXPIRING", self.num_expiring()),
            ("OK", self.num_valid()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistinguishedName;
    use chrono::TimeZone;

    fn cert(subject: &str, issuer: &str, not_after: DateTime<Utc>) -> Certificate {
        Certificate {
            subject: DistinguishedName::from_common_name(subject),
            issuer: DistinguishedName::from_common_name(issuer),
            serial: vec![1],
            not_before: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            not_after,
            dns_names: vec![],
            ip_addresses: vec![],
            signature_algorithm: String::new(),
            signature_digest: None,
            raw_der: vec![],
        }
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn chain(leaf: DateTime<Utc>, inter: DateTime<Utc>, root: DateTime<Utc>) -> Vec<Certificate> {
        vec![
            cert("www.example.com", "Intermediate CA", leaf),
            cert("Intermediate CA", "Root CA", inter),
            cert("Root CA", "Root CA", root),
        ]
    }

    fn config_at(now: DateTime<Utc>) -> CheckConfig {
        CheckConfig {
            now,
            ..CheckConfig::new("www.example.com")
        }
    }

    #[test]
    fn test_healthy_chain() {
        let chain = chain(date(2025, 4, 1), date(2028, 1, 1), date(2034, 1, 1));
        let result = validate_expiration(&chain, &config_at(date(2025, 1, 1)));
        assert_eq!(result.service_state(), ServiceState::Ok);
        assert!(result.status().starts_with(
            "expiration validation successful; leaf cert \"www.example.com\" expires next in 90d"
        ));
        assert_eq!(result.overview(), "[EXPIRED: 0, EXPIRING: 0, OK: 3]");
    }

    #[test]
    fn test_expiring_leaf_warns() {
        let chain = chain(date(2025, 4, 1), date(2028, 1, 1), date(2034, 1, 1));
        let result = validate_expiration(&chain, &config_at(date(2025, 3, 10)));
        assert_eq!(result.service_state(), ServiceState::Warning);
        assert_eq!(result.priority_modifier(), PRIORITY_MODIFIER_MINIMUM);
        assert!(result.status().starts_with("expiration validation failed"));
        assert_eq!(result.overview(), "[EXPIRED: 0, EXPIRING: 1, OK: 2]");
        assert!(matches!(
            result.err(),
            Some(ValidationError::ExpiringCertFound(_))
        ));
    }

    #[test]
    fn test_expired_leaf_is_critical() {
        let chain = chain(date(2025, 4, 1), date(2028, 1, 1), date(2034, 1, 1));
        let result = validate_expiration(&chain, &config_at(date(2025, 4, 4)));
        assert_eq!(result.service_state(), ServiceState::Critical);
        assert_eq!(result.priority_modifier(), PRIORITY_MODIFIER_MAXIMUM);
        assert!(result.status().contains("expired 3d ago"));
    }

    #[test]
    fn test_expired_root_warns_unless_ignored() {
        let chain = chain(date(2026, 1, 1), date(2026, 1, 1), date(2025, 1, 1));
        let now = date(2025, 3, 1);
        let result = validate_expiration(&chain, &config_at(now));
        assert_eq!(result.service_state(), ServiceState::Warning);
        assert!(!result.is_ignored());

        let config = CheckConfig {
            ignore_expired_root: true,
            ..config_at(now)
        };
        let result = validate_expiration(&chain, &config);
        assert!(result.is_ignored());
        assert_eq!(result.num_expired(), 1);
    }

    #[test]
    fn test_expired_intermediate_is_critical() {
        let chain = chain(date(2026, 1, 1), date(2025, 1, 1), date(2034, 1, 1));
        let result = validate_expiration(&chain, &config_at(date(2025, 3, 1)));
        assert_eq!(result.service_state(), ServiceState::Critical);
    }

    #[test]
    fn test_expiring_intermediate_alone_is_ignored_when_suppressed() {
        let chain = chain(date(2026, 1, 1), date(2025, 3, 20), date(2034, 1, 1));
        let now = date(2025, 3, 1);
        let result = validate_expiration(&chain, &config_at(now));
        assert_eq!(result.service_state(), ServiceState::Warning);
        assert!(!result.is_ignored());

        let config = CheckConfig {
            ignore_expiring_intermediate: true,
            ..config_at(now)
        };
        let result = validate_expiration(&chain, &config);
        assert!(result.is_ignored());
        assert!(result.status().contains("intermediate cert"));
        assert_eq!(result.num_expiring(), 1);
    }

    #[test]
    fn test_expiring_root_alone_is_ignored_when_suppressed() {
        let chain = chain(date(2026, 1, 1), date(2028, 1, 1), date(2025, 3, 20));
        let now = date(2025, 3, 1);
        let result = validate_expiration(&chain, &config_at(now));
        assert_eq!(result.service_state(), ServiceState::Warning);
        assert!(!result.is_ignored());

        let config = CheckConfig {
            ignore_expiring_root: true,
            ..config_at(now)
        };
        let result = validate_expiration(&chain, &config);
        assert!(result.is_ignored());
        assert!(result.status().contains("root cert"));
        assert_eq!(result.num_expiring(), 1);
    }

    #[test]
    fn test_suppressed_condition_falls_through_to_next() {
        // expiring intermediate ignored, expired root still warns
        let chain = chain(date(2026, 1, 1), date(2025, 3, 20), date(2025, 2, 1));
        let config = CheckConfig {
            ignore_expiring_intermediate: true,
            ..config_at(date(2025, 3, 1))
        };
        let result = validate_expiration(&chain, &config);
        assert!(!result.is_ignored());
        assert_eq!(result.service_state(), ServiceState::Warning);
        assert!(result.status().contains("root cert"));
    }

    #[test]
    fn test_zero_threshold_is_missing_value() {
        let chain = chain(date(2026, 1, 1), date(2028, 1, 1), date(2034, 1, 1));
        let config = CheckConfig {
            age_critical: 0,
            ..config_at(date(2025, 1, 1))
        };
        let result = validate_expiration(&chain, &config);
        assert_eq!(result.service_state(), ServiceState::Unknown);
        assert!(matches!(result.err(), Some(ValidationError::MissingValue(_))));
    }

    #[test]
    fn test_critical_above_warning_is_invalid_input() {
        let chain = chain(date(2026, 1, 1), date(2028, 1, 1), date(2034, 1, 1));
        let config = CheckConfig {
            age_warning: 10,
            age_critical: 20,
            ..config_at(date(2025, 1, 1))
        };
        let result = validate_expiration(&chain, &config);
        assert_eq!(result.service_state(), ServiceState::Unknown);
        assert_eq!(result.priority_modifier(), PRIORITY_MODIFIER_MAXIMUM);
        assert!(matches!(result.err(), Some(ValidationError::InvalidInput(_))));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::days(90)), "90d");
        assert_eq!(format_duration(Duration::hours(50)), "2d 2h");
        assert_eq!(format_duration(Duration::hours(5)), "5h");
    }
}
