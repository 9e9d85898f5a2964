//! Performance data points
//!
//! Rendered as `'<label>'=<value><uom>;<warn>;<crit>;<min>;<max>`.

use crate::utils::PerfDataError;
use std::fmt;

/// Units of measurement accepted by monitoring hosts
pub const VALID_UOMS: &[&str] = &["", "s", "ms", "us", "%", "B", "KB", "MB", "GB", "TB", "c"];

/// One performance data metric
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceData {
    pub label: String,
    pub value: f64,
    pub unit_of_measurement: String,
    /// Warning range in threshold syntax
    pub warn: String,
    /// Critical range in threshold syntax
    pub crit: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PerformanceData {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            ..Self::default()
        }
    }

    pub fn with_uom(mut self, uom: impl Into<String>) -> Self {
        self.unit_of_measurement = uom.into();
        self
    }

    pub fn with_warn(mut self, range: impl Into<String>) -> Self {
        self.warn = range.into();
        self
    }

    pub fn with_crit(mut self, range: impl Into<String>) -> Self {
        self.crit = range.into();
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Key used for de-duplication and ordering
    pub fn key(&self) -> String {
        self.label.to_lowercase()
    }

    pub fn validate(&self) -> Result<(), PerfDataError> {
        if self.label.is_empty() {
            return Err(PerfDataError::EmptyLabel);
        }
        if self.label.contains('\'') {
            return Err(PerfDataError::QuoteInLabel {
                label: self.label.clone(),
            });
        }
        if !self.value.is_finite() {
            return Err(PerfDataError::NonFiniteValue {
                label: self.label.clone(),
            });
        }
        if !VALID_UOMS.contains(&self.unit_of_measurement.as_str()) {
            return Err(PerfDataError::InvalidUom {
                label: self.label.clone(),
                uom: self.unit_of_measurement.clone(),
            });
        }
        Ok(())
    }
}

fn format_number(value: f64) -> String {
    format!("{}", value)
}

impl fmt::Display for PerformanceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let optional = |v: Option<f64>| v.map(format_number).unwrap_or_default();
        write!(
            f,
            "'{}'={}{};{};{};{};{}",
            self.label,
            format_number(self.value),
            self.unit_of_measurement,
            self.warn,
            self.crit,
            optional(self.min),
            optional(self.max)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_full_metric() {
        let pd = PerformanceData::new("expires_leaf", 22.0)
            .with_warn("30:")
            .with_crit("15:")
            .with_min(0.0);
        assert_eq!(pd.to_string(), "'expires_leaf'=22;30:;15:;0;");
    }

    #[test]
    fn test_render_fractional_with_uom() {
        let pd = PerformanceData::new("time", 12.5).with_uom("ms");
        assert_eq!(pd.to_string(), "'time'=12.5ms;;;;");
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            PerformanceData::new("", 1.0).validate(),
            Err(PerfDataError::EmptyLabel)
        );
        assert!(matches!(
            PerformanceData::new("it's", 1.0).validate(),
            Err(PerfDataError::QuoteInLabel { .. })
        ));
        assert!(matches!(
            PerformanceData::new("x", f64::NAN).validate(),
            Err(PerfDataError::NonFiniteValue { .. })
        ));
        assert!(matches!(
            PerformanceData::new("x", 1.0).with_uom("d").validate(),
            Err(PerfDataError::InvalidUom { .. })
        ));
        assert!(PerformanceData::new("x", 1.0).with_uom("%").validate().is_ok());
    }

    #[test]
    fn test_key_is_case_folded() {
        assert_eq!(PerformanceData::new("Time", 1.0).key(), "time");
    }
}
