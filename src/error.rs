//! Error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for takeover operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the manager, the parser and the domain helpers.
#[derive(Debug, Error)]
pub enum Error {
    /// A filesystem primitive failed and no fallback was left to try.
    #[error("{op} {}: {source}", .path.display())]
    Io {
        /// The primitive that failed (`read`, `write`, `stat`, ...).
        op: &'static str,
        /// The path it was applied to.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resolver configuration could not be parsed.
    #[error("resolv.conf line {line}: {reason}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// A domain name was rejected.
    #[error("invalid domain name: {0:?}")]
    InvalidDomain(String),
}

impl Error {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied)
    }

    /// Returns `true` if the underlying I/O error is `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
