//! Error types for the command-line driver.
//!
//! Library reports are wrapped with one of these as they cross into the CLI,
//! so the printed report names the stage that failed above the cause.

use std::fmt;
use std::path::PathBuf;

/// Stage of a CLI run that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration could not be loaded or describes an invalid setup.
    Config,
    /// The state file could not be read or written.
    State,
    /// The gate rejected the command.
    Command { name: &'static str },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "failed to load configuration"),
            Self::State => write!(f, "failed to access state file"),
            Self::Command { name } => write!(f, "'{name}' failed"),
        }
    }
}

impl std::error::Error for CliError {}

/// State file errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    Read { path: PathBuf, reason: String },
    Parse { path: PathBuf, reason: String },
    Write { path: PathBuf, reason: String },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, reason } => {
                write!(f, "cannot read '{}': {reason}", path.display())
            }
            Self::Parse { path, reason } => {
                write!(f, "'{}' is not a valid state file: {reason}", path.display())
            }
            Self::Write { path, reason } => {
                write!(f, "cannot write '{}': {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for StateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_names_command() {
        let err = CliError::Command { name: "sign-in" };
        assert_eq!(err.to_string(), "'sign-in' failed");
    }

    #[test]
    fn state_error_includes_path() {
        let err = StateError::Parse {
            path: PathBuf::from("/tmp/state.json"),
            reason: "expected value".to_string(),
        };
        assert!(err.to_string().contains("/tmp/state.json"));
    }
}
