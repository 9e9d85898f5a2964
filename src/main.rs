//! check_cert - Nagios plugin validating X.509 certificate chains

use check_cert::cli::{Cli, LogLevel};
use check_cert::models::ServiceState;
use check_cert::plugin::Plugin;
use check_cert::runner;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_logging(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.as_filter())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// First line of a clap error without the `error: ` prefix
fn summarize_usage_error(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("invalid arguments")
        .trim_start_matches("error: ")
        .trim()
        .to_string()
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            init_logging(LogLevel::Warn);
            let mut plugin = Plugin::new();
            plugin.service_output = format!(
                "{}: invalid command-line arguments",
                ServiceState::Unknown.label()
            );
            plugin.add_error(anyhow::anyhow!(summarize_usage_error(&err)));
            plugin.set_exit_status(ServiceState::Unknown);
            std::process::exit(plugin.return_check_results());
        }
    };

    init_logging(cli.log_level);

    let mut plugin = Plugin::new();
    let code = plugin.run(|plugin| runner::run_check(plugin, &cli));
    std::process::exit(code);
}
