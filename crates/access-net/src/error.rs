//! Error types for the reachability module.

use thiserror::Error;

/// Network-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// A connection target could not be turned into a reachability handle.
    #[error("cannot resolve reachability target '{target}': {reason}")]
    Resolution {
        /// The target as given by the caller.
        target: String,
        /// Why the backend rejected it.
        reason: String,
    },
    /// The change callback could not be registered.
    #[error("failed to register reachability callback: {0}")]
    Registration(String),
}

impl NetworkError {
    /// Build a [`NetworkError::Resolution`] for `target`.
    pub fn resolution(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
