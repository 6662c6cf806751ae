// src/error.rs

//! Error types shared across the publishing pipeline
//!
//! Every fatal error carries a fixed process exit code so a failed run can be
//! diagnosed from the exit status alone, without parsing log output. Codes are
//! assigned per variant in `exit_code` and never change as code is reorganised.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while publishing a repository
#[derive(Error, Debug)]
pub enum Error {
    /// Input file (package artifact, index file) does not exist
    #[error("File '{0}' not found")]
    FileNotFound(PathBuf),

    /// Template file does not exist; rendering cannot start at all
    #[error("Template file '{0}' not found")]
    TemplateNotFound(PathBuf),

    /// Checksum algorithm name not in the supported set
    #[error("Unknown checksum type '{0}'")]
    UnknownAlgorithm(String),

    /// Reading a file for digest computation failed
    #[error("Failed to compute {algorithm} checksum for '{path}': {source}")]
    Checksum {
        path: PathBuf,
        algorithm: &'static str,
        source: std::io::Error,
    },

    /// External tool is not installed or not on PATH
    #[error("Required tool '{0}' was not found on this system")]
    ToolNotFound(String),

    /// External tool ran but exited non-zero
    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// External tool exceeded its allotted wall-clock time and was killed
    #[error("{tool} timed out after {seconds} seconds")]
    ToolTimeout { tool: String, seconds: u64 },

    /// A scan step produced no output at all; an empty index would make the
    /// repository claim there are no packages, so this is escalated
    #[error("{tool} produced no output; refusing to publish an empty index")]
    ScanEmpty { tool: String },

    /// No signing key configured; an unsigned repository is not installable
    /// by strict APT clients
    #[error("No signing key configured; pass --signing-key or set APTPRESS_SIGNING_KEY")]
    MissingSigningKey,

    /// Local read/write/permission failure outside the cases above
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl Error {
    /// Fixed registry of process exit codes, one per fatal condition
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::FileNotFound(_) => 1,
            Error::TemplateNotFound(_) => 2,
            Error::UnknownAlgorithm(_) => 3,
            Error::Checksum { .. } => 4,
            Error::ToolNotFound(_) => 5,
            Error::ToolFailed { .. } => 6,
            Error::ToolTimeout { .. } => 7,
            Error::ScanEmpty { .. } => 8,
            Error::MissingSigningKey => 9,
            Error::Io { .. } => 10,
        }
    }

    /// Wrap an I/O error with a short description of the operation that failed
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_unique() {
        let errors = [
            Error::FileNotFound(PathBuf::from("x")),
            Error::TemplateNotFound(PathBuf::from("x")),
            Error::UnknownAlgorithm("x".to_string()),
            Error::Checksum {
                path: PathBuf::from("x"),
                algorithm: "SHA256",
                source: std::io::Error::other("x"),
            },
            Error::ToolNotFound("x".to_string()),
            Error::ToolFailed {
                tool: "x".to_string(),
                code: 1,
                stderr: String::new(),
            },
            Error::ToolTimeout {
                tool: "x".to_string(),
                seconds: 1,
            },
            Error::ScanEmpty {
                tool: "x".to_string(),
            },
            Error::MissingSigningKey,
            Error::io("x", std::io::Error::other("x")),
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len(), "exit codes must be unique");
        assert!(codes.iter().all(|&c| c > 0), "exit codes must be positive");
    }

    #[test]
    fn test_exit_codes_are_stable() {
        assert_eq!(Error::MissingSigningKey.exit_code(), 9);
        assert_eq!(
            Error::TemplateNotFound(PathBuf::from("t")).exit_code(),
            2
        );
    }
}
