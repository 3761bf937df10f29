use std::time::Duration;
use thiserror::Error;

/// Errors raised while driving a payment flow.
///
/// Only faults live here. A declined authorization or a failed settlement is
/// a signed artifact returned as data, not an error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Integrity error: {0}")]
    Integrity(String),
    #[error("Declined: {0}")]
    Declined(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Call to {principal} timed out after {after:?}")]
    Timeout {
        principal: &'static str,
        after: Duration,
    },
    #[error("Flow cancelled")]
    Cancelled,
    #[error("Invalid step: expected {expected}, flow is at {actual}")]
    InvalidStep {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Cart {0} has expired")]
    CartExpired(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Whether the error must halt the flow instance and be shown to the operator.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProtocolError::Declined(_) | ProtocolError::Execution(_))
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declines_and_ledger_failures_are_not_fatal() {
        assert!(!ProtocolError::Declined("user declined".to_string()).is_fatal());
        assert!(!ProtocolError::Execution("insufficient funds".to_string()).is_fatal());
        assert!(ProtocolError::Integrity("bad signature".to_string()).is_fatal());
        assert!(ProtocolError::Cancelled.is_fatal());
    }

    #[test]
    fn test_timeout_names_the_principal() {
        let error = ProtocolError::Timeout {
            principal: "merchant-agent",
            after: Duration::from_millis(20),
        };
        assert_eq!(error.to_string(), "Call to merchant-agent timed out after 20ms");
    }
}
