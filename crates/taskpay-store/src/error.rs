//! Store error types

use taskpay_core::LedgerError;

/// Backend failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Insert of a record whose key already exists
    #[error("{kind} already exists: {key}")]
    Conflict { kind: &'static str, key: String },

    /// Snapshot file could not be read or written
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot file is not valid JSON
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Backend unavailable
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create conflict error
    #[inline]
    pub fn conflict(kind: &'static str, key: impl std::fmt::Display) -> Self {
        Self::Conflict {
            kind,
            key: key.to_string(),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        LedgerError::Storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_retryable_ledger_error() {
        let err: LedgerError = StoreError::Unavailable("connection reset".to_string()).into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn conflict_display() {
        let err = StoreError::conflict("user", "u1");
        assert_eq!(err.to_string(), "user already exists: u1");
    }
}
