//! Error types and result aliases for renbuild.
//!
//! This module defines the error handling infrastructure:
//! - [`BuildError`]: every failure the engine can raise, grouped by [`ErrorCategory`]
//! - [`LocatedError`]: a [`BuildError`] tagged with the input file and line it came from
//! - [`Result<T>`]: alias used by the engine's public operations

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LocatedError>;

/// Broad classes of failure. Advisory conditions never become errors; they are
/// logged as warnings at the point they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Structural,
    Resource,
    Configuration,
    Substitution,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Structural => "structural",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Substitution => "substitution",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Inconsistent indentation detected: {found} columns does not match a known level (nearest is {nearest})")]
    InconsistentIndent { found: usize, nearest: usize },

    #[error("Expecting new indent")]
    ExpectedIndent,

    #[error("Line is indented, but not expecting a new indent")]
    UnexpectedIndent,

    #[error("Malformed arguments for directive ':{keyword}': {line}")]
    MalformedDirective { keyword: String, line: String },

    #[error("{} is not an accessible file", .0.display())]
    InputNotFound(PathBuf),

    #[error("Import cycle: {} is already being read", .0.display())]
    ImportCycle(PathBuf),

    #[error("Unable to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to create output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown config option {0}")]
    UnknownConfigKey(String),

    #[error("Invalid value for config option {key}: {reason}")]
    InvalidConfigValue { key: String, reason: String },

    #[error("Malformed flow_control_ignore list: {0}")]
    MalformedIgnoreList(String),

    #[error("Unable to compile pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Unable to replace line with template '{template}': {reason}")]
    Template { template: String, reason: String },
}

impl BuildError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            BuildError::InconsistentIndent { .. }
            | BuildError::ExpectedIndent
            | BuildError::UnexpectedIndent
            | BuildError::MalformedDirective { .. }
            | BuildError::ImportCycle(_) => ErrorCategory::Structural,
            BuildError::InputNotFound(_)
            | BuildError::Io { .. }
            | BuildError::OutputDirectory { .. } => ErrorCategory::Resource,
            BuildError::UnknownConfigKey(_)
            | BuildError::InvalidConfigValue { .. }
            | BuildError::MalformedIgnoreList(_) => ErrorCategory::Configuration,
            BuildError::Pattern { .. } | BuildError::Template { .. } => {
                ErrorCategory::Substitution
            }
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A [`BuildError`] carrying the input location that triggered it.
///
/// Displays as `file|line message`, the same prefix used by log lines.
#[derive(Debug, Error)]
#[error("{location}{error}")]
pub struct LocatedError {
    pub location: String,
    #[source]
    pub error: BuildError,
}

impl LocatedError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            BuildError::ExpectedIndent.category(),
            ErrorCategory::Structural
        );
        assert_eq!(
            BuildError::UnknownConfigKey("x".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            BuildError::InputNotFound(PathBuf::from("a.rps")).category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            BuildError::Template {
                template: "{1}".into(),
                reason: "missing group".into()
            }
            .category(),
            ErrorCategory::Substitution
        );
    }

    #[test]
    fn test_located_display() {
        let err = LocatedError {
            location: "story.rps|12 ".to_string(),
            error: BuildError::UnexpectedIndent,
        };
        assert_eq!(
            err.to_string(),
            "story.rps|12 Line is indented, but not expecting a new indent"
        );
    }
}
