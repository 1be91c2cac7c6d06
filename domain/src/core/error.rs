//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid repository URL: {0}")]
    InvalidRepoUrl(String),

    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Event rejected: {0}")]
    EventRejected(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::InvalidLocale("x".to_string()).is_cancelled());
        assert!(!DomainError::EventRejected("late".to_string()).is_cancelled());
    }
}
