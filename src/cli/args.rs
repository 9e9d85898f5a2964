//! CLI argument definitions using clap

use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "check_cert")]
#[command(version)]
#[command(
    about = "Nagios-compatible plugin that validates X.509 certificate chains",
    long_about = None
)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .multiple(true)
        .args(["server", "filename"])
))]
pub struct Cli {
    /// Server to retrieve the certificate chain from; also the default
    /// hostname to verify
    #[arg(short, long, value_name = "HOST")]
    pub server: Option<String>,

    /// TCP port (default: 443)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Name to send via SNI and verify against the leaf certificate
    #[arg(long, value_name = "NAME")]
    pub dns_name: Option<String>,

    /// Read the chain from a PEM file instead of the network
    #[arg(short, long, value_name = "FILE")]
    pub filename: Option<PathBuf>,

    /// Entries required in the leaf's SANs list (comma separated)
    #[arg(long, value_name = "ENTRIES", value_delimiter = ',')]
    pub sans_entries: Vec<String>,

    /// Days before expiration that trigger WARNING (default: 30)
    #[arg(short = 'w', long, value_name = "DAYS")]
    pub age_warning: Option<u32>,

    /// Days before expiration reported as the CRITICAL range (default: 15)
    #[arg(short = 'c', long, value_name = "DAYS")]
    pub age_critical: Option<u32>,

    /// Connection timeout in seconds (default: 10)
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Validation checks to apply (expiration, hostname, sans, chain-order, root)
    #[arg(long, value_name = "KEYWORDS", value_delimiter = ',')]
    pub apply_validation: Vec<String>,

    /// Validation checks to run without counting toward the final state
    #[arg(long, value_name = "KEYWORDS", value_delimiter = ',')]
    pub ignore_validation: Vec<String>,

    /// Do not count expired intermediate certificates
    #[arg(long)]
    pub ignore_expired_intermediate_certs: bool,

    /// Do not count expired root certificates
    #[arg(long)]
    pub ignore_expired_root_certs: bool,

    /// Do not count expiring intermediate certificates
    #[arg(long)]
    pub ignore_expiring_intermediate_certs: bool,

    /// Do not count expiring root certificates
    #[arg(long)]
    pub ignore_expiring_root_certs: bool,

    /// Skip hostname verification when the leaf has no SANs entries
    #[arg(long)]
    pub ignore_hostname_verification_if_empty_sans: bool,

    /// List every certificate in the detailed report
    #[arg(short, long)]
    pub verbose: bool,

    /// Embed a JSON summary as an encoded payload
    #[arg(long)]
    pub payload: bool,

    /// Settings file (default: ./check_cert.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level for stderr diagnostics, overridden by RUST_LOG
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
