//! Error taxonomy for the organize pipeline.
//!
//! Only errors that invalidate a whole batch (bad arguments, unreadable
//! source root, corrupt undo log) are fatal. Per-file failures are carried
//! inside move and restore outcomes and never abort the batch.

use crate::config::ConfigError;
use std::path::PathBuf;

/// Errors that can occur while planning, moving, or undoing.
#[derive(Debug)]
pub enum OrganizeError {
    /// Bad command-line input.
    InvalidArgument { reason: String },
    /// The source directory is missing, not a directory, or unreadable.
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A single planned move could not be performed.
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        reason: String,
    },
    /// The undo log could not be written.
    LogWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The undo log could not be read.
    LogReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The undo log exists but cannot be parsed.
    LogCorrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    /// A single recorded move could not be reversed.
    RestoreFailed {
        original: PathBuf,
        destination: PathBuf,
        reason: String,
    },
    /// Configuration could not be loaded or compiled.
    Config(ConfigError),
}

impl OrganizeError {
    /// Returns true for errors that abort the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MoveFailed { .. } | Self::RestoreFailed { .. })
    }
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument { reason } => write!(f, "Invalid argument: {}", reason),
            Self::SourceUnreadable { path, source } => {
                write!(f, "Cannot read source {}: {}", path.display(), source)
            }
            Self::MoveFailed {
                source,
                destination,
                reason,
            } => write!(
                f,
                "Failed to move {} to {}: {}",
                source.display(),
                destination.display(),
                reason
            ),
            Self::LogWriteFailed { path, source } => {
                write!(f, "Failed to write undo log {}: {}", path.display(), source)
            }
            Self::LogReadFailed { path, source } => {
                write!(f, "Failed to read undo log {}: {}", path.display(), source)
            }
            Self::LogCorrupt { path, line, reason } => write!(
                f,
                "Undo log {} is corrupt at line {}: {}",
                path.display(),
                line,
                reason
            ),
            Self::RestoreFailed {
                original,
                destination,
                reason,
            } => write!(
                f,
                "Failed to restore {} to {}: {}",
                destination.display(),
                original.display(),
                reason
            ),
            Self::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceUnreadable { source, .. }
            | Self::LogWriteFailed { source, .. }
            | Self::LogReadFailed { source, .. } => Some(source),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for OrganizeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Result type for organize operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
