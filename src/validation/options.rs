//! Check configuration
//!
//! Every check receives one [`CheckConfig`] record. Checks never consult
//! process-wide settings, which keeps them testable in isolation.

use crate::utils::ConfigError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Default warning threshold in days
pub const DEFAULT_AGE_WARNING: u32 = 30;

/// Default critical threshold in days
pub const DEFAULT_AGE_CRITICAL: u32 = 15;

/// Sentinel that disables the SANs check when it is the first requested entry
pub const SKIP_SANS_CHECKS_KEYWORD: &str = "SKIPSANSCHECKS";

/// Keywords accepted by the apply/ignore validation lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValidationKeyword {
    Expiration,
    Hostname,
    Sans,
    ChainOrder,
    Root,
}

impl ValidationKeyword {
    pub const ALL: [ValidationKeyword; 5] = [
        ValidationKeyword::Expiration,
        ValidationKeyword::Hostname,
        ValidationKeyword::Sans,
        ValidationKeyword::ChainOrder,
        ValidationKeyword::Root,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationKeyword::Expiration => "expiration",
            ValidationKeyword::Hostname => "hostname",
            ValidationKeyword::Sans => "sans",
            ValidationKeyword::ChainOrder => "chain-order",
            ValidationKeyword::Root => "root",
        }
    }

    /// Whether the check runs without being named in the apply list
    pub fn enabled_by_default(&self) -> bool {
        matches!(
            self,
            ValidationKeyword::Expiration | ValidationKeyword::Hostname | ValidationKeyword::Sans
        )
    }

    fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ValidationKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationKeyword {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownValidationKeyword {
                keyword: s.trim().to_string(),
                valid: Self::valid_list(),
            })
    }
}

/// Parsed apply and ignore keyword sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationKeywords {
    apply: Vec<ValidationKeyword>,
    ignore: Vec<ValidationKeyword>,
}

impl ValidationKeywords {
    /// Parse both lists. Each entry may itself be a comma separated list.
    ///
    /// A keyword named in both lists is rejected rather than resolved.
    pub fn parse<A, I>(apply: &[A], ignore: &[I]) -> Result<Self, ConfigError>
    where
        A: AsRef<str>,
        I: AsRef<str>,
    {
        let apply = parse_list(apply)?;
        let ignore = parse_list(ignore)?;

        if let Some(conflict) = apply.iter().find(|k| ignore.contains(k)) {
            return Err(ConfigError::ConflictingValidationKeyword {
                keyword: conflict.as_str().to_string(),
            });
        }

        Ok(Self { apply, ignore })
    }

    /// Whether the check for `keyword` should run
    pub fn is_applied(&self, keyword: ValidationKeyword) -> bool {
        keyword.enabled_by_default() || self.apply.contains(&keyword)
    }

    /// Whether `keyword` was named in the apply list
    pub fn is_requested(&self, keyword: ValidationKeyword) -> bool {
        self.apply.contains(&keyword)
    }

    /// Whether the result for `keyword` is excluded from the verdict
    pub fn is_ignored(&self, keyword: ValidationKeyword) -> bool {
        self.ignore.contains(&keyword)
    }

    pub fn applied(&self) -> &[ValidationKeyword] {
        &self.apply
    }

    pub fn ignored(&self) -> &[ValidationKeyword] {
        &self.ignore
    }
}

fn parse_list<S: AsRef<str>>(entries: &[S]) -> Result<Vec<ValidationKeyword>, ConfigError> {
    let mut keywords = Vec::new();
    for entry in entries {
        for part in entry.as_ref().split(',') {
            if part.trim().is_empty() {
                continue;
            }
            let keyword: ValidationKeyword = part.parse()?;
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
    }
    Ok(keywords)
}

/// Options shared by every validation check
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Server the chain was retrieved from
    pub server: String,
    /// Explicit name to verify instead of `server`
    pub dns_name: Option<String>,
    /// SANs entries the leaf must carry
    pub sans_entries: Vec<String>,
    /// Days before expiration that trigger WARNING
    pub age_warning: u32,
    /// Days before expiration shown as the critical threshold
    pub age_critical: u32,
    /// Include every certificate in check reports
    pub verbose: bool,
    /// Evaluation time
    pub now: DateTime<Utc>,
    /// Apply/ignore selection
    pub keywords: ValidationKeywords,
    pub ignore_expired_intermediate: bool,
    pub ignore_expired_root: bool,
    pub ignore_expiring_intermediate: bool,
    pub ignore_expiring_root: bool,
    /// Skip hostname failure when the leaf has no SANs entries
    pub ignore_hostname_if_empty_sans: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            dns_name: None,
            sans_entries: Vec::new(),
            age_warning: DEFAULT_AGE_WARNING,
            age_critical: DEFAULT_AGE_CRITICAL,
            verbose: false,
            now: Utc::now(),
            keywords: ValidationKeywords::default(),
            ignore_expired_intermediate: false,
            ignore_expired_root: false,
            ignore_expiring_intermediate: false,
            ignore_expiring_root: false,
            ignore_hostname_if_empty_sans: false,
        }
    }
}

impl CheckConfig {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    /// The name the hostname check verifies
    pub fn hostname_to_verify(&self) -> &str {
        self.dns_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.server.trim())
    }

    /// Requested SANs entries with blanks removed
    pub fn requested_sans(&self) -> Vec<String> {
        self.sans_entries
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn is_ignored(&self, keyword: ValidationKeyword) -> bool {
        self.keywords.is_ignored(keyword)
    }

    pub fn is_applied(&self, keyword: ValidationKeyword) -> bool {
        self.keywords.is_applied(keyword)
    }
}
