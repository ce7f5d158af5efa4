use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`crate::Sink`] operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The unit was deleted or is otherwise no longer reachable. Fatal for a streaming session.
    #[error("Unit not found: {0}")]
    NotFound(String),

    /// The sink refused the call because of its rate limit.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other failure (connectivity, permissions, ...). Treated as transient.
    #[error("Sink error: {0}")]
    Other(String),
}

impl SinkError {
    /// True when the session must stop streaming instead of retrying on the next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SinkError::NotFound(_))
    }

    /// Retry-After hint carried by a rate-limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SinkError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result of a single sink call.
pub type SinkResult<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_found_is_fatal() {
        assert!(SinkError::NotFound("42".to_string()).is_fatal());
        assert!(!SinkError::RateLimited { retry_after: None }.is_fatal());
        assert!(!SinkError::Other("timeout".to_string()).is_fatal());
    }

    #[test]
    fn test_retry_after_only_from_rate_limit() {
        let err = SinkError::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(SinkError::Other("x".to_string()).retry_after(), None);
    }
}
