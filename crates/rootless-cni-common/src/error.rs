//! Unified error types for the rootless CNI infra workspace.
//!
//! Higher-level crates define their own domain-specific error enums that
//! wrap these common variants when appropriate.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum InfraError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The request body or an identifier inside it is unusable.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Creating or entering a namespace, or spawning a helper process, failed.
    #[error("namespace setup failed: {message}")]
    Namespace {
        /// Description of the failed step.
        message: String,
    },

    /// On-disk state contradicts itself (e.g. a PID file with garbage in it).
    #[error("inconsistent state: {message}")]
    Consistency {
        /// Description of the inconsistency.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl InfraError {
    /// Builds an [`InfraError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns whether this error reports a missing file or directory.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, InfraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_is_reported_as_not_found() {
        let err = InfraError::io(
            "/run/x/pid",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn permission_error_is_not_not_found() {
        let err = InfraError::io(
            "/run/x/pid",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn display_includes_path() {
        let err = InfraError::io("/run/x", std::io::Error::other("boom"));
        assert_eq!(err.to_string(), "I/O error at /run/x: boom");
    }
}
