//! Error types for roster-core

use thiserror::Error;

/// Result type alias using roster-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the persistence and validation layers
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A profile with the same identifier is already stored
    #[error("Profile already exists: {0}")]
    Conflict(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result shape returned by every public sync, store-facing and lookup operation
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Failure reported across a component boundary.
///
/// Carries a human-readable reason; nothing below this type escapes as a panic
/// or a foreign error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The remote endpoint could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The remote endpoint answered, but not with usable data
    #[error("API error: {0}")]
    Api(String),

    /// Local persistence failed
    #[error("Store error: {0}")]
    Store(String),
}

impl SyncError {
    /// The reason without the kind prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Network(reason) | Self::Api(reason) | Self::Store(reason) => reason,
        }
    }
}

impl From<Error> for SyncError {
    fn from(error: Error) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Api(format!("malformed response body: {error}"))
        } else if let Some(status) = error.status() {
            Self::Api(format!("HTTP {}", status.as_u16()))
        } else {
            Self::Network(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_become_store_failures() {
        let failure = SyncError::from(Error::Conflict("abc".to_string()));
        assert_eq!(
            failure,
            SyncError::Store("Profile already exists: abc".to_string())
        );
    }

    #[test]
    fn reason_strips_kind_prefix() {
        let failure = SyncError::Api("No profiles received".to_string());
        assert_eq!(failure.reason(), "No profiles received");
        assert_eq!(failure.to_string(), "API error: No profiles received");
    }
}
