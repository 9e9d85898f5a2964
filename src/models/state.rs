//! Monitoring-plugin service states and exit codes

use serde::Serialize;
use std::fmt;

/// Service state reported to the monitoring host.
///
/// The numeric exit codes are read directly by Nagios-compatible hosts and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
    Dependent,
}

impl ServiceState {
    /// Process exit code for this state
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
            ServiceState::Dependent => 4,
        }
    }

    /// Label used as the service output prefix
    pub fn label(&self) -> &'static str {
        match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
            ServiceState::Dependent => "DEPENDENT",
        }
    }

    /// Rank used when reducing several states to one.
    ///
    /// OK < WARNING < CRITICAL < UNKNOWN. DEPENDENT is never produced by
    /// validation and sits just below UNKNOWN.
    pub fn severity(&self) -> u8 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Dependent => 3,
            ServiceState::Unknown => 4,
        }
    }

    /// The more severe of two states
    pub fn max(self, other: ServiceState) -> ServiceState {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn from_exit_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ServiceState::Ok),
            1 => Some(ServiceState::Warning),
            2 => Some(ServiceState::Critical),
            3 => Some(ServiceState::Unknown),
            4 => Some(ServiceState::Dependent),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
