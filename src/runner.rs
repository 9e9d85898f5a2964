//! Check orchestration engine
//!
//! Turns parsed arguments and settings into a plugin run: load the chain,
//! validate it, then fill in every section of the plugin artifact.

use crate::certificate::chain::{
    count_positions, leaf, next_to_expire_at, num_expired, num_expiring,
};
use crate::certificate::{fetch_chain, read_pem_file, ChainPosition, FetchTarget};
use crate::cli::Cli;
use crate::config::{load_settings, OutputSettings, Settings};
use crate::models::{Certificate, ServiceState};
use crate::output::{format_chain_summary, PayloadDocument};
use crate::plugin::{ErrorAnnotations, PerformanceData, Plugin};
use crate::utils::{CertificateError, ConfigError, FetchError, ValidationError};
use crate::validation::{validate_chain, CheckConfig, ValidationKeyword, ValidationKeywords};
use anyhow::Context;
use chrono::Duration;
use std::fmt;
use std::path::PathBuf;

/// Where the chain comes from
#[derive(Debug, Clone)]
pub enum ChainSource {
    File(PathBuf),
    Network(FetchTarget),
}

impl fmt::Display for ChainSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainSource::File(path) => write!(f, "{}", path.display()),
            ChainSource::Network(target) => f.write_str(&target.address()),
        }
    }
}

/// Configuration for a check run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub check: CheckConfig,
    pub source: ChainSource,
    pub embed_payload: bool,
}

impl RunConfig {
    /// Merge command-line flags over loaded settings
    pub fn from_cli(cli: &Cli, settings: &Settings) -> Result<Self, ConfigError> {
        let keywords = ValidationKeywords::parse(
            cli.apply_validation.as_slice(),
            cli.ignore_validation.as_slice(),
        )?;

        let mut check = CheckConfig::new(cli.server.clone().unwrap_or_default());
        check.dns_name = cli.dns_name.clone();
        check.sans_entries = cli.sans_entries.clone();
        check.age_warning = cli.age_warning.unwrap_or(settings.thresholds.age_warning);
        check.age_critical = cli.age_critical.unwrap_or(settings.thresholds.age_critical);
        check.verbose = cli.verbose;
        check.keywords = keywords;
        check.ignore_expired_intermediate = cli.ignore_expired_intermediate_certs;
        check.ignore_expired_root = cli.ignore_expired_root_certs;
        check.ignore_expiring_intermediate = cli.ignore_expiring_intermediate_certs;
        check.ignore_expiring_root = cli.ignore_expiring_root_certs;
        check.ignore_hostname_if_empty_sans = cli.ignore_hostname_verification_if_empty_sans;

        let source = match (&cli.filename, &cli.server) {
            (Some(path), _) => ChainSource::File(path.clone()),
            (None, Some(server)) if !server.trim().is_empty() => {
                let timeout_secs = cli.timeout.unwrap_or(settings.connection.timeout_secs);
                if timeout_secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "timeout".to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                let port = cli.port.unwrap_or(settings.connection.port);
                let target = FetchTarget::new(
                    server.trim(),
                    port,
                    std::time::Duration::from_secs(timeout_secs),
                )
                .with_sni(cli.dns_name.clone());
                ChainSource::Network(target)
            }
            _ => return Err(ConfigError::MissingTarget),
        };

        Ok(Self {
            check,
            source,
            embed_payload: cli.payload || settings.output.embed_payload,
        })
    }

    fn port(&self) -> Option<u16> {
        match &self.source {
            ChainSource::Network(target) => Some(target.port),
            ChainSource::File(_) => None,
        }
    }
}

/// Apply label, visibility and annotation settings to the plugin
pub fn configure_plugin(plugin: &mut Plugin, output: &OutputSettings) {
    plugin.hide_errors = output.hide_errors;
    plugin.hide_thresholds = output.hide_thresholds;
    plugin.errors_label = Some(output.errors_label.clone());
    plugin.thresholds_label = Some(output.thresholds_label.clone());
    plugin.detailed_info_label = Some(output.detailed_info_label.clone());
    plugin.encoded_payload_label = Some(output.encoded_payload_label.clone());
    plugin.payload_delimiter_left = output.payload_delimiter_left.clone();
    plugin.payload_delimiter_right = output.payload_delimiter_right.clone();
    plugin.annotations = output.annotate_errors.then(ErrorAnnotations::default);
}

/// Load the chain from its source.
///
/// A source that yields no certificates is an empty chain, not an error.
pub fn load_chain(source: &ChainSource) -> anyhow::Result<Vec<Certificate>> {
    match source {
        ChainSource::File(path) => match read_pem_file(path) {
            Ok(chain) => Ok(chain),
            Err(CertificateError::NoCertificates { .. }) => Ok(Vec::new()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to read certificate chain from {}", path.display())
            }),
        },
        ChainSource::Network(target) => match fetch_chain(target) {
            Ok(fetched) => {
                tracing::debug!(
                    peer = %fetched.peer,
                    protocol = %fetched.protocol,
                    handshake_ms = fetched.handshake_ms,
                    "handshake complete"
                );
                Ok(fetched.certificates)
            }
            Err(FetchError::NoCertificates { .. }) => Ok(Vec::new()),
            Err(err) => Err(err).with_context(|| {
                format!(
                    "failed to retrieve certificate chain from {}",
                    target.address()
                )
            }),
        },
    }
}

fn days(value: Duration) -> f64 {
    value.num_seconds() as f64 / 86_400.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Performance data describing the chain
pub fn chain_metrics(chain: &[Certificate], config: &CheckConfig) -> Vec<PerformanceData> {
    let now = config.now;
    let threshold = now + Duration::days(i64::from(config.age_warning));
    let counts = count_positions(chain);
    let mut metrics = Vec::new();

    if let Some(leaf) = leaf(chain) {
        metrics.push(
            PerformanceData::new("expires_leaf", round2(days(leaf.time_remaining(now))))
                .with_warn(format!("{}:", config.age_warning))
                .with_crit(format!("{}:", config.age_critical)),
        );
        metrics.push(
            PerformanceData::new(
                "life_remaining_leaf",
                round2(leaf.life_remaining_percent(now)),
            )
            .with_uom("%")
            .with_min(0.0)
            .with_max(100.0),
        );
    }

    if let Some(index) = next_to_expire_at(chain, ChainPosition::Intermediate) {
        let intermediate = &chain[index];
        metrics.push(PerformanceData::new(
            "expires_intermediate",
            round2(days(intermediate.time_remaining(now))),
        ));
        metrics.push(
            PerformanceData::new(
                "life_remaining_intermediate",
                round2(intermediate.life_remaining_percent(now)),
            )
            .with_uom("%")
            .with_min(0.0)
            .with_max(100.0),
        );
    }

    let counters = [
        ("certs_present_leaf", counts.leaves()),
        ("certs_present_intermediate", counts.intermediate),
        ("certs_present_root", counts.root),
        ("certs_present_unknown", counts.unknown),
        ("certs_expired", num_expired(chain, now)),
        ("certs_expiring", num_expiring(chain, now, threshold)),
    ];
    metrics.extend(
        counters
            .into_iter()
            .map(|(label, value)| PerformanceData::new(label, value as f64).with_min(0.0)),
    );

    metrics
}

fn fail(plugin: &mut Plugin, state: ServiceState, summary: String, err: anyhow::Error) {
    tracing::warn!(error = %format!("{:#}", err), "{}", summary);
    plugin.service_output = format!("{}: {}", state.label(), summary);
    plugin.add_error(err);
    plugin.set_exit_status(state);
}

/// Load, validate and report on one chain
pub fn execute(plugin: &mut Plugin, run: &RunConfig) {
    let config = &run.check;

    let chain = match load_chain(&run.source) {
        Ok(chain) => chain,
        Err(err) => {
            let summary = err.to_string();
            fail(plugin, ServiceState::Critical, summary, err);
            return;
        }
    };

    if chain.is_empty() {
        let summary = format!("no certificates found in {}", run.source);
        let err = ValidationError::MissingValue(summary.clone());
        fail(plugin, ServiceState::Unknown, summary, err.into());
        return;
    }

    let results = validate_chain(&chain, config);
    let state = results.service_state();

    plugin.service_output = results.service_output();
    plugin.long_service_output = format!(
        "{}\n\n{}",
        results.detail_listing(),
        format_chain_summary(&chain, config.now)
    );
    for err in results.errors() {
        plugin.add_error(err.clone());
    }

    if config.is_applied(ValidationKeyword::Expiration) {
        plugin.warning_threshold = format!(
            "Expiring certificates: leaf and intermediate certs expire in less than {} days",
            config.age_warning
        );
        plugin.critical_threshold = format!(
            "Expired certificates: leaf cert expired, or expires in less than {} days",
            config.age_critical
        );
    }

    if let Err(err) = plugin.add_perf_data(chain_metrics(&chain, config)) {
        tracing::warn!(error = %err, "failed to record performance data");
        plugin.add_error(err);
    }

    if run.embed_payload {
        let document = PayloadDocument::new(
            config.server.clone(),
            run.port(),
            config.hostname_to_verify(),
            &chain,
            &results,
            config.now,
        );
        match document.to_json() {
            Ok(json) => plugin.set_payload_string(&json),
            Err(err) => {
                plugin.add_error(anyhow::Error::new(err).context("failed to encode payload"))
            }
        }
    }

    plugin.set_exit_status(state);
}

/// Entry point used by the binary inside the panic-safe terminator
pub fn run_check(plugin: &mut Plugin, cli: &Cli) {
    let settings = match load_settings(cli.config.as_ref()) {
        Ok(settings) => settings,
        Err(err) => {
            let summary = "failed to load settings".to_string();
            fail(plugin, ServiceState::Unknown, summary, err.into());
            return;
        }
    };
    configure_plugin(plugin, &settings.output);

    let run = match RunConfig::from_cli(cli, &settings) {
        Ok(run) => run,
        Err(err) => {
            let summary = "invalid plugin options".to_string();
            fail(plugin, ServiceState::Unknown, summary, err.into());
            return;
        }
    };

    tracing::debug!(source = %run.source, "starting check");
    execute(plugin, &run);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistinguishedName;
    use chrono::{TimeZone, Utc};
    use clap::Parser;

    fn cert(subject: &str, issuer: &str, not_after: (i32, u32, u32)) -> Certificate {
        Certificate {
            subject: DistinguishedName::from_common_name(subject),
            issuer: DistinguishedName::from_common_name(issuer),
            serial: vec![1],
            not_before: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc
                .with_ymd_and_hms(not_after.0, not_after.1, not_after.2, 0, 0, 0)
                .unwrap(),
            dns_names: vec![],
            ip_addresses: vec![],
            signature_algorithm: "1.2.840.10045.4.3.2".to_string(),
            signature_digest: None,
            raw_der: vec![],
        }
    }

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["check_cert"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_overrides_settings() {
        let mut settings = Settings::default();
        settings.thresholds.age_warning = 60;
        settings.connection.port = 8443;

        let cli = parse(&["-s", "www.example.com", "-w", "45", "--dns-name", "alt.example.com"]);
        let run = RunConfig::from_cli(&cli, &settings).unwrap();

        assert_eq!(run.check.age_warning, 45);
        assert_eq!(run.check.age_critical, 15);
        assert_eq!(run.check.hostname_to_verify(), "alt.example.com");
        match &run.source {
            ChainSource::Network(target) => {
                assert_eq!(target.port, 8443);
                assert_eq!(target.sni.as_deref(), Some("alt.example.com"));
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert_eq!(run.port(), Some(8443));
    }

    #[test]
    fn test_filename_takes_precedence() {
        let cli = parse(&["-s", "www.example.com", "-f", "chain.pem"]);
        let run = RunConfig::from_cli(&cli, &Settings::default()).unwrap();
        assert!(matches!(run.source, ChainSource::File(_)));
        assert_eq!(run.port(), None);
    }

    #[test]
    fn test_conflicting_keywords_are_rejected() {
        let cli = parse(&[
            "-s",
            "www.example.com",
            "--apply-validation",
            "root",
            "--ignore-validation",
            "root",
        ]);
        let err = RunConfig::from_cli(&cli, &Settings::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ConflictingValidationKeyword { .. }
        ));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let cli = parse(&["-s", "www.example.com", "-t", "0"]);
        let err = RunConfig::from_cli(&cli, &Settings::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_chain_metrics() {
        let chain = vec![
            cert("www.example.com", "Example Intermediate", (2025, 4, 1)),
            cert("Example Intermediate", "Example Root", (2025, 1, 21)),
            cert("Example Root", "Example Root", (2030, 1, 1)),
        ];
        let mut config = CheckConfig::new("www.example.com");
        config.now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let metrics = chain_metrics(&chain, &config);
        let find = |label: &str| {
            metrics
                .iter()
                .find(|m| m.label == label)
                .unwrap_or_else(|| panic!("missing {}", label))
        };

        let leaf = find("expires_leaf");
        assert_eq!(leaf.value, 90.0);
        assert_eq!(leaf.warn, "30:");
        assert_eq!(leaf.crit, "15:");
        assert_eq!(find("expires_intermediate").value, 20.0);
        assert_eq!(find("certs_present_leaf").value, 1.0);
        assert_eq!(find("certs_present_intermediate").value, 1.0);
        assert_eq!(find("certs_present_root").value, 1.0);
        assert_eq!(find("certs_expired").value, 0.0);
        assert_eq!(find("certs_expiring").value, 1.0);
        assert_eq!(find("life_remaining_leaf").unit_of_measurement, "%");
        for metric in &metrics {
            metric.validate().unwrap();
        }
    }

    #[test]
    fn test_missing_file_is_critical() {
        let mut plugin = Plugin::default();
        plugin.skip_os_exit = true;
        let cli = parse(&["-f", "/nonexistent/chain.pem"]);
        let run = RunConfig::from_cli(&cli, &Settings::default()).unwrap();

        execute(&mut plugin, &run);

        assert_eq!(plugin.exit_status, ServiceState::Critical);
        assert!(plugin
            .service_output
            .starts_with("CRITICAL: failed to read certificate chain from /nonexistent/chain.pem"));
        assert_eq!(plugin.errors.len(), 1);
    }
}
