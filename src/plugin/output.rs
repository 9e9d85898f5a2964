//! Plugin state and output assembly
//!
//! A [`Plugin`] is created once per invocation, mutated while the check
//! runs and consumed by [`Plugin::return_check_results`], which renders the
//! whole artifact into one buffer, writes it with a single call and exits
//! with the configured state.

use super::annotate::ErrorAnnotations;
use super::panic::{self as panic_capture, CapturedPanic};
use super::perfdata::PerformanceData;
use super::range::Range;
use super::{
    CHECK_OUTPUT_EOL, DEFAULT_DETAILED_INFO_LABEL, DEFAULT_ENCODED_PAYLOAD_LABEL,
    DEFAULT_ERRORS_LABEL, DEFAULT_THRESHOLDS_LABEL, DEFAULT_TIME_METRIC_LABEL,
    PANIC_SERVICE_OUTPUT,
};
use crate::models::ServiceState;
use crate::payload::{self, DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER};
use crate::utils::{PerfDataError, RangeError, ValidationError};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Instant;

type Branding = Box<dyn Fn() -> String + Send>;

/// State of one plugin invocation
pub struct Plugin {
    /// First line of output
    pub service_output: String,
    /// Body of the DETAILED INFO section
    pub long_service_output: String,
    /// Single error reported before the errors list
    pub last_error: Option<anyhow::Error>,
    /// Errors listed in the ERRORS section, in insertion order
    pub errors: Vec<anyhow::Error>,
    /// Shown in the THRESHOLDS section
    pub warning_threshold: String,
    pub critical_threshold: String,
    /// State used for the process exit code
    pub exit_status: ServiceState,
    pub errors_label: Option<String>,
    pub thresholds_label: Option<String>,
    pub detailed_info_label: Option<String>,
    pub encoded_payload_label: Option<String>,
    pub hide_errors: bool,
    pub hide_thresholds: bool,
    pub payload_delimiter_left: String,
    pub payload_delimiter_right: String,
    /// Advice appended to recognised errors when set
    pub annotations: Option<ErrorAnnotations>,
    /// Write the artifact but do not terminate the process
    pub skip_os_exit: bool,
    perf_data: BTreeMap<String, PerformanceData>,
    payload: Vec<u8>,
    branding: Option<Branding>,
    start: Option<Instant>,
    output_sink: Box<dyn Write + Send>,
}

impl Default for Plugin {
    /// A plugin without a start time; no default `time` metric is emitted
    fn default() -> Self {
        Self {
            service_output: String::new(),
            long_service_output: String::new(),
            last_error: None,
            errors: Vec::new(),
            warning_threshold: String::new(),
            critical_threshold: String::new(),
            exit_status: ServiceState::Unknown,
            errors_label: None,
            thresholds_label: None,
            detailed_info_label: None,
            encoded_payload_label: None,
            hide_errors: false,
            hide_thresholds: false,
            payload_delimiter_left: DEFAULT_LEFT_DELIMITER.to_string(),
            payload_delimiter_right: DEFAULT_RIGHT_DELIMITER.to_string(),
            annotations: None,
            skip_os_exit: false,
            perf_data: BTreeMap::new(),
            payload: Vec::new(),
            branding: None,
            start: None,
            output_sink: Box::new(io::stdout()),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("service_output", &self.service_output)
            .field("exit_status", &self.exit_status)
            .field("errors", &self.errors.len())
            .field("perf_data", &self.perf_data.len())
            .field("payload_bytes", &self.payload.len())
            .field("start", &self.start)
            .field("skip_os_exit", &self.skip_os_exit)
            .finish_non_exhaustive()
    }
}

/// Rewrite every line break in `text` as the check output terminator.
///
/// Lines already ending in a space keep it as the terminator's space, so
/// text built with [`CHECK_OUTPUT_EOL`] passes through unchanged.
fn with_check_eol(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            line.strip_suffix(' ').unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join(CHECK_OUTPUT_EOL)
}

impl Plugin {
    /// Create a plugin and record the start time for the `time` metric
    pub fn new() -> Self {
        Self {
            start: Some(Instant::now()),
            ..Self::default()
        }
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.start
    }

    pub fn set_exit_status(&mut self, state: ServiceState) {
        self.exit_status = state;
    }

    /// Append an error to the ERRORS section
    pub fn add_error(&mut self, err: impl Into<anyhow::Error>) {
        self.errors.push(err.into());
    }

    /// Validate every point, then insert them keyed by case-folded label.
    ///
    /// Nothing is inserted when any point is invalid. A label already
    /// present is replaced.
    pub fn add_perf_data(
        &mut self,
        points: impl IntoIterator<Item = PerformanceData>,
    ) -> Result<(), PerfDataError> {
        let points: Vec<PerformanceData> = points.into_iter().collect();
        for point in &points {
            point.validate()?;
        }
        for point in points {
            self.perf_data.insert(point.key(), point);
        }
        Ok(())
    }

    /// Metrics sorted by case-folded label
    pub fn perf_data(&self) -> impl Iterator<Item = &PerformanceData> {
        self.perf_data.values()
    }

    /// Set the exit state from the ranges carried by `points`.
    ///
    /// Critical ranges are evaluated before warning ranges. An unparseable
    /// range sets UNKNOWN and is returned.
    pub fn evaluate_thresholds(&mut self, points: &[PerformanceData]) -> Result<(), RangeError> {
        let crossed = |range_of: fn(&PerformanceData) -> &str| -> Result<bool, RangeError> {
            for point in points {
                let expr = range_of(point).trim();
                if expr.is_empty() {
                    continue;
                }
                if Range::parse(expr)?.check(point.value) {
                    tracing::debug!(label = %point.label, value = point.value, range = expr, "threshold crossed");
                    return Ok(true);
                }
            }
            Ok(false)
        };

        let outcome = crossed(|p| p.crit.as_str()).and_then(|critical| {
            if critical {
                Ok(Some(ServiceState::Critical))
            } else {
                crossed(|p| p.warn.as_str()).map(|warning| warning.then_some(ServiceState::Warning))
            }
        });

        match outcome {
            Ok(Some(state)) => {
                self.exit_status = state;
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                self.exit_status = ServiceState::Unknown;
                Err(err)
            }
        }
    }

    /// Replace the payload buffer
    pub fn set_payload_bytes(&mut self, bytes: impl AsRef<[u8]>) {
        self.payload = bytes.as_ref().to_vec();
    }

    /// Append to the payload buffer
    pub fn add_payload_bytes(&mut self, bytes: impl AsRef<[u8]>) {
        self.payload.extend_from_slice(bytes.as_ref());
    }

    pub fn set_payload_string(&mut self, s: &str) {
        self.set_payload_bytes(s.as_bytes());
    }

    pub fn add_payload_string(&mut self, s: &str) {
        self.add_payload_bytes(s.as_bytes());
    }

    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn set_output_target(&mut self, sink: impl Write + Send + 'static) {
        self.output_sink = Box::new(sink);
    }

    /// Line emitted after all sections
    pub fn set_branding(&mut self, branding: impl Fn() -> String + Send + 'static) {
        self.branding = Some(Box::new(branding));
    }

    fn render_error(&self, err: &anyhow::Error) -> String {
        match &self.annotations {
            Some(annotations) => annotations.annotate(err),
            None => format!("{:#}", err),
        }
    }

    fn label<'s>(custom: &'s Option<String>, default: &'s str) -> &'s str {
        custom.as_deref().unwrap_or(default)
    }

    fn errors_shown(&self) -> bool {
        !self.hide_errors && (self.last_error.is_some() || !self.errors.is_empty())
    }

    fn thresholds_shown(&self) -> bool {
        !self.hide_thresholds
            && (!self.warning_threshold.is_empty() || !self.critical_threshold.is_empty())
    }

    /// Metrics to emit, including the default `time` metric when it applies
    fn final_perf_data(&self) -> Vec<PerformanceData> {
        let mut metrics = self.perf_data.clone();
        if let Some(start) = self.start {
            metrics
                .entry(DEFAULT_TIME_METRIC_LABEL.to_string())
                .or_insert_with(|| {
                    PerformanceData::new(
                        DEFAULT_TIME_METRIC_LABEL,
                        start.elapsed().as_millis() as f64,
                    )
                    .with_uom("ms")
                });
        }
        metrics.into_values().collect()
    }

    /// Assemble the complete artifact
    pub fn render(&self) -> String {
        let eol = CHECK_OUTPUT_EOL;
        let mut out = String::from(self.service_output.trim_end());

        let terminate = |out: &mut String| {
            if !out.ends_with(eol) {
                out.push_str(eol);
            }
        };

        let errors_shown = self.errors_shown();
        if errors_shown {
            terminate(&mut out);
            out.push_str(eol);
            out.push_str(Self::label(&self.errors_label, DEFAULT_ERRORS_LABEL));
            out.push_str(eol);
            out.push_str(eol);
            for err in self.last_error.iter().chain(self.errors.iter()) {
                out.push_str("* ");
                out.push_str(&with_check_eol(&self.render_error(err)));
                out.push_str(eol);
            }
        }

        let thresholds_shown = self.thresholds_shown();
        if thresholds_shown {
            terminate(&mut out);
            out.push_str(eol);
            out.push_str(Self::label(&self.thresholds_label, DEFAULT_THRESHOLDS_LABEL));
            out.push_str(eol);
            out.push_str(eol);
            if !self.critical_threshold.is_empty() {
                out.push_str(&format!(
                    "* CRITICAL: {}{}",
                    with_check_eol(&self.critical_threshold),
                    eol
                ));
            }
            if !self.warning_threshold.is_empty() {
                out.push_str(&format!(
                    "* WARNING: {}{}",
                    with_check_eol(&self.warning_threshold),
                    eol
                ));
            }
        }

        let payload_shown = !self.payload.is_empty();
        let long_output = self.long_service_output.trim_end();
        if !long_output.is_empty() {
            terminate(&mut out);
            if errors_shown || thresholds_shown || payload_shown {
                out.push_str(eol);
                out.push_str(Self::label(
                    &self.detailed_info_label,
                    DEFAULT_DETAILED_INFO_LABEL,
                ));
                out.push_str(eol);
                out.push_str(eol);
            }
            out.push_str(&with_check_eol(long_output));
            out.push_str(eol);
        }

        if payload_shown {
            let encoded = payload::encode(
                &self.payload,
                &self.payload_delimiter_left,
                &self.payload_delimiter_right,
            );
            terminate(&mut out);
            out.push_str(eol);
            out.push_str(Self::label(
                &self.encoded_payload_label,
                DEFAULT_ENCODED_PAYLOAD_LABEL,
            ));
            out.push_str(eol);
            out.push_str(eol);
            out.push_str(&encoded);
            out.push_str(eol);
        }

        if let Some(branding) = &self.branding {
            terminate(&mut out);
            out.push_str(eol);
            out.push_str(&with_check_eol(branding().trim_end()));
            out.push_str(eol);
        }

        if !self.service_output.trim().is_empty() {
            let metrics = self.final_perf_data();
            if !metrics.is_empty() {
                out.push_str(" |");
                for metric in &metrics {
                    out.push(' ');
                    out.push_str(&metric.to_string());
                }
                out.push_str(eol);
            }
        }

        terminate(&mut out);
        out
    }

    /// Convert a recovered panic into a CRITICAL result
    pub fn handle_panic(&mut self, captured: CapturedPanic) {
        let eol = CHECK_OUTPUT_EOL;
        tracing::error!(message = %captured.message, "recovered from panic");
        self.service_output = PANIC_SERVICE_OUTPUT.to_string();
        self.long_service_output = format!(
            "```{eol}panic: {message}{eol}{eol}stack trace:{eol}{trace}{eol}```",
            eol = eol,
            message = captured.message,
            trace = captured.backtrace.trim_end(),
        );
        self.add_error(ValidationError::PanicDetected(captured.message));
        self.exit_status = ServiceState::Critical;
    }

    /// Write the artifact with one call, then exit unless `skip_os_exit`.
    ///
    /// Returns the exit code when the process is not terminated.
    pub fn return_check_results(&mut self) -> i32 {
        let output = self.render();
        let code = self.exit_status.exit_code();

        if let Err(err) = self
            .output_sink
            .write_all(output.as_bytes())
            .and_then(|_| self.output_sink.flush())
        {
            tracing::error!(error = %err, "failed to write plugin output");
        }

        if !self.skip_os_exit {
            std::process::exit(code);
        }
        code
    }

    /// Run `check` with panic recovery, then emit the results
    pub fn run(&mut self, check: impl FnOnce(&mut Plugin)) -> i32 {
        if let Err(captured) = panic_capture::catch(|| check(self)) {
            self.handle_panic(captured);
        }
        self.return_check_results()
    }
}

/// Cloneable in-memory sink, useful for capturing output in tests
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin() -> (Plugin, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let mut plugin = Plugin::default();
        plugin.set_output_target(buffer.clone());
        plugin.skip_os_exit = true;
        (plugin, buffer)
    }

    #[test]
    fn test_service_output_only() {
        let (mut plugin, buffer) = plugin();
        plugin.service_output = "OK: all good   ".to_string();
        plugin.exit_status = ServiceState::Ok;
        assert_eq!(plugin.return_check_results(), 0);
        assert_eq!(buffer.contents(), "OK: all good \n");
    }

    #[test]
    fn test_perf_data_on_first_line_when_no_sections() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "OK: fine".to_string();
        plugin
            .add_perf_data([PerformanceData::new("b", 2.0), PerformanceData::new("A", 1.0)])
            .unwrap();
        assert_eq!(plugin.render(), "OK: fine | 'A'=1;;;; 'b'=2;;;; \n");
    }

    #[test]
    fn test_perf_data_requires_service_output() {
        let (mut plugin, _) = plugin();
        plugin.add_perf_data([PerformanceData::new("a", 1.0)]).unwrap();
        assert!(!plugin.render().contains('|'));
    }

    #[test]
    fn test_perf_data_replaces_case_folded_label() {
        let (mut plugin, _) = plugin();
        plugin
            .add_perf_data([PerformanceData::new("Size", 1.0), PerformanceData::new("size", 2.0)])
            .unwrap();
        let metrics: Vec<_> = plugin.perf_data().collect();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, 2.0);
    }

    #[test]
    fn test_invalid_perf_data_inserts_nothing() {
        let (mut plugin, _) = plugin();
        let result = plugin.add_perf_data([PerformanceData::new("ok", 1.0), PerformanceData::new("", 1.0)]);
        assert_eq!(result, Err(PerfDataError::EmptyLabel));
        assert_eq!(plugin.perf_data().count(), 0);
    }

    #[test]
    fn test_sections_layout() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "CRITICAL: broken".to_string();
        plugin.add_error(anyhow::anyhow!("first"));
        plugin.critical_threshold = "15d".to_string();
        plugin.warning_threshold = "30d".to_string();
        plugin.long_service_output = "details".to_string();
        assert_eq!(
            plugin.render(),
            "CRITICAL: broken \n \n**ERRORS** \n \n* first \n \n**THRESHOLDS** \n \n\
             * CRITICAL: 15d \n* WARNING: 30d \n \n**DETAILED INFO** \n \ndetails \n"
        );
    }

    #[test]
    fn test_with_check_eol() {
        assert_eq!(with_check_eol("a\nb"), "a \nb");
        assert_eq!(with_check_eol("a \n\nb"), "a \n \nb");
        assert_eq!(with_check_eol("a\r\nb"), "a \nb");
        assert_eq!(with_check_eol("single"), "single");
    }

    #[test]
    fn test_multiline_sections_use_terminator() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "WARNING: check".to_string();
        plugin.add_error(anyhow::anyhow!("line one\nline two"));
        plugin.long_service_output = "first\n  second\n\nthird \nfourth".to_string();
        let out = plugin.render();

        assert!(out.contains("* line one \nline two \n"));
        assert!(out.contains("first \n  second \n \nthird \nfourth \n"));
        assert!(!out.contains("  \n"));
        for (i, _) in out.match_indices('\n') {
            assert_eq!(&out[i - 1..i], " ", "bare line feed at {} in {:?}", i, out);
        }
    }

    #[test]
    fn test_detailed_info_header_suppressed_when_alone() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "OK: fine".to_string();
        plugin.long_service_output = "details".to_string();
        assert_eq!(plugin.render(), "OK: fine \ndetails \n");
    }

    #[test]
    fn test_last_error_precedes_errors_and_hidden_errors() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "CRITICAL: x".to_string();
        plugin.last_error = Some(anyhow::anyhow!("legacy"));
        plugin.add_error(anyhow::anyhow!("listed"));
        let rendered = plugin.render();
        assert!(rendered.find("* legacy").unwrap() < rendered.find("* listed").unwrap());

        plugin.hide_errors = true;
        assert!(!plugin.render().contains("**ERRORS**"));
    }

    #[test]
    fn test_custom_labels() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "WARNING: x".to_string();
        plugin.add_error(anyhow::anyhow!("e"));
        plugin.errors_label = Some("PROBLEMS".to_string());
        assert!(plugin.render().contains(" \nPROBLEMS \n"));
    }

    #[test]
    fn test_branding_line() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "OK: x".to_string();
        plugin.set_branding(|| "check_cert 0.1.0".to_string());
        assert_eq!(plugin.render(), "OK: x \n \ncheck_cert 0.1.0 \n");
    }

    #[test]
    fn test_default_time_metric_only_with_start() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "OK: x".to_string();
        assert!(!plugin.render().contains("'time'"));

        let mut plugin = Plugin::new();
        plugin.service_output = "OK: x".to_string();
        assert!(plugin.render().contains("'time'="));

        plugin
            .add_perf_data([PerformanceData::new("time", 42.0).with_uom("s")])
            .unwrap();
        assert!(plugin.render().contains("'time'=42s"));
    }

    #[test]
    fn test_evaluate_thresholds() {
        let (mut plugin, _) = plugin();
        let points = [
            PerformanceData::new("a", 25.0).with_warn("30:").with_crit("15:"),
            PerformanceData::new("b", 10.0).with_warn("30:").with_crit("15:"),
        ];
        plugin.evaluate_thresholds(&points).unwrap();
        assert_eq!(plugin.exit_status, ServiceState::Critical);

        let points = [PerformanceData::new("a", 25.0).with_warn("30:").with_crit("15:")];
        plugin.evaluate_thresholds(&points).unwrap();
        assert_eq!(plugin.exit_status, ServiceState::Warning);

        let points = [PerformanceData::new("a", 25.0).with_crit("nope")];
        assert!(plugin.evaluate_thresholds(&points).is_err());
        assert_eq!(plugin.exit_status, ServiceState::Unknown);
    }

    #[test]
    fn test_annotations_applied_when_enabled() {
        let (mut plugin, _) = plugin();
        plugin.service_output = "CRITICAL: x".to_string();
        plugin.add_error(io::Error::new(io::ErrorKind::TimedOut, "dial timeout"));
        assert!(!plugin.render().contains("increasing timeout"));
        plugin.annotations = Some(ErrorAnnotations::default());
        assert!(plugin
            .render()
            .contains("* dial timeout: consider increasing timeout value"));
    }

    #[test]
    fn test_run_recovers_from_panic() {
        let (mut plugin, buffer) = plugin();
        let code = plugin.run(|p| {
            p.service_output = "OK: never shown".to_string();
            panic!("boom");
        });
        assert_eq!(code, 2);
        let out = buffer.contents();
        assert!(out.starts_with(PANIC_SERVICE_OUTPUT));
        assert!(out.contains("* panic-detected: boom"));
        assert!(out.contains("```"));
        assert!(out.contains("panic: boom"));
    }
}
