//! Advice appended to well-known network errors
//!
//! Classification walks the error chain for an `std::io::Error` of a
//! recognised kind. Annotating is idempotent.

use std::collections::HashMap;
use std::io;

pub const ADVICE_DEADLINE_EXCEEDED: &str = "consider increasing timeout value";
pub const ADVICE_CONNECTION_RESET: &str =
    "consider checking firewall rules, port bindings and max connection limits on the remote host";
pub const ADVICE_CONNECTION_REFUSED: &str = "verify that the service is running on the given port";

/// Low-level error kinds that carry advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotatedKind {
    DeadlineExceeded,
    ConnectionReset,
    ConnectionRefused,
}

impl AnnotatedKind {
    fn from_io(kind: io::ErrorKind) -> Option<Self> {
        match kind {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Some(AnnotatedKind::DeadlineExceeded)
            }
            io::ErrorKind::ConnectionReset => Some(AnnotatedKind::ConnectionReset),
            io::ErrorKind::ConnectionRefused => Some(AnnotatedKind::ConnectionRefused),
            _ => None,
        }
    }
}

/// Map from error kind to advice text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorAnnotations {
    advice: HashMap<AnnotatedKind, String>,
}

impl Default for ErrorAnnotations {
    fn default() -> Self {
        let advice = [
            (AnnotatedKind::DeadlineExceeded, ADVICE_DEADLINE_EXCEEDED),
            (AnnotatedKind::ConnectionReset, ADVICE_CONNECTION_RESET),
            (AnnotatedKind::ConnectionRefused, ADVICE_CONNECTION_REFUSED),
        ]
        .into_iter()
        .map(|(kind, text)| (kind, text.to_string()))
        .collect();
        Self { advice }
    }
}

impl ErrorAnnotations {
    /// An empty map
    pub fn none() -> Self {
        Self {
            advice: HashMap::new(),
        }
    }

    /// Replace or add the advice for one kind
    pub fn with_advice(mut self, kind: AnnotatedKind, advice: impl Into<String>) -> Self {
        self.advice.insert(kind, advice.into());
        self
    }

    pub fn advice_for(&self, kind: AnnotatedKind) -> Option<&str> {
        self.advice.get(&kind).map(String::as_str)
    }

    /// First recognised io error kind in the chain
    pub fn classify(err: &anyhow::Error) -> Option<AnnotatedKind> {
        err.chain()
            .filter_map(|cause| cause.downcast_ref::<io::Error>())
            .find_map(|io_err| AnnotatedKind::from_io(io_err.kind()))
    }

    /// Render the error chain and append advice when it applies
    pub fn annotate(&self, err: &anyhow::Error) -> String {
        let message = format!("{:#}", err);
        match Self::classify(err).and_then(|kind| self.advice_for(kind)) {
            Some(advice) => annotate_message(&message, advice),
            None => message,
        }
    }
}

/// `"<message>: <advice>"` unless the advice is already present
pub fn annotate_message(message: &str, advice: &str) -> String {
    if advice.is_empty() || message.contains(advice) {
        message.to_string()
    } else {
        format!("{}: {}", message, advice)
    }
}
