//! Monitoring-plugin output protocol
//!
//! Assembles the text artifact read by Nagios-compatible hosts: service
//! output, ERRORS, THRESHOLDS, DETAILED INFO and ENCODED PAYLOAD sections,
//! followed by sorted performance data.

pub mod annotate;
pub mod output;
pub mod panic;
pub mod perfdata;
pub mod range;

pub use annotate::{annotate_message, AnnotatedKind, ErrorAnnotations};
pub use output::{Plugin, SharedBuffer};
pub use panic::CapturedPanic;
pub use perfdata::{PerformanceData, VALID_UOMS};
pub use range::{AlertOn, Range};

/// Line terminator, renders correctly in both Nagios Core and Nagios XI
pub const CHECK_OUTPUT_EOL: &str = " \n";

pub const DEFAULT_ERRORS_LABEL: &str = "**ERRORS**";
pub const DEFAULT_THRESHOLDS_LABEL: &str = "**THRESHOLDS**";
pub const DEFAULT_DETAILED_INFO_LABEL: &str = "**DETAILED INFO**";
pub const DEFAULT_ENCODED_PAYLOAD_LABEL: &str = "**ENCODED PAYLOAD**";

/// Label of the metric measuring plugin runtime
pub const DEFAULT_TIME_METRIC_LABEL: &str = "time";

pub const PANIC_SERVICE_OUTPUT: &str =
    "CRITICAL: plugin crash detected. See details via web UI or run plugin manually via CLI.";
