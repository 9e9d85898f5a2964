//! Monitoring-plugin threshold ranges
//!
//! Grammar: `[@][start:][end]` where `~` as start means negative infinity,
//! an omitted start is 0 and an omitted end is positive infinity. A value
//! alerts when it is outside the range, or inside it with a leading `@`.

use crate::utils::RangeError;
use std::fmt;
use std::str::FromStr;

/// Which side of the range raises an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOn {
    Outside,
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub start: f64,
    pub end: f64,
    pub alert_on: AlertOn,
}

impl Range {
    pub fn parse(input: &str) -> Result<Self, RangeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RangeError::Empty);
        }

        let (alert_on, body) = match trimmed.strip_prefix('@') {
            Some(rest) => (AlertOn::Inside, rest),
            None => (AlertOn::Outside, trimmed),
        };

        let invalid = |message: &str| RangeError::Invalid {
            input: input.to_string(),
            message: message.to_string(),
        };

        let (start, end) = match body.split_once(':') {
            Some((start, end)) => {
                let start = match start.trim() {
                    "~" => f64::NEG_INFINITY,
                    "" => 0.0,
                    s => parse_number(s).ok_or_else(|| invalid("start is not a number"))?,
                };
                let end = match end.trim() {
                    "" => f64::INFINITY,
                    e => parse_number(e).ok_or_else(|| invalid("end is not a number"))?,
                };
                (start, end)
            }
            None => {
                let end = parse_number(body.trim()).ok_or_else(|| invalid("not a number"))?;
                (0.0, end)
            }
        };

        if start > end {
            return Err(RangeError::StartAfterEnd {
                input: input.to_string(),
                start,
                end,
            });
        }

        Ok(Self {
            start,
            end,
            alert_on,
        })
    }

    /// Whether `value` lies within the range, endpoints included
    pub fn contains(&self, value: f64) -> bool {
        let above_start = self.start == f64::NEG_INFINITY || value >= self.start;
        let below_end = self.end == f64::INFINITY || value <= self.end;
        above_start && below_end
    }

    /// Whether `value` should raise an alert
    pub fn check(&self, value: f64) -> bool {
        match self.alert_on {
            AlertOn::Outside => !self.contains(value),
            AlertOn::Inside => self.contains(value),
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Range::parse(s)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alert_on == AlertOn::Inside {
            f.write_str("@")?;
        }
        if self.start == f64::NEG_INFINITY {
            f.write_str("~:")?;
        } else if self.start != 0.0 {
            write!(f, "{}:", self.start)?;
        }
        if self.end != f64::INFINITY {
            write!(f, "{}", self.end)?;
        } else if self.start == 0.0 {
            f.write_str("0:")?;
        }
        Ok(())
    }
}
