//! Error types for multissl
//!
//! All modules use `MultisslResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for multissl operations
pub type MultisslResult<T> = Result<T, MultisslError>;

/// All errors that can occur while driving the pipeline
#[derive(Error, Debug)]
pub enum MultisslError {
    // Fetch errors
    #[error("Download failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    // Extraction errors
    #[error("Archive entry escapes the expected root: {entry}")]
    PathTraversal { entry: String },

    #[error("Archive read error in {archive}: {reason}")]
    ArchiveInvalid { archive: PathBuf, reason: String },

    // Build errors
    #[error("Build step '{step}' failed with {status}")]
    BuildFailure { step: String, status: String },

    #[error("Version mismatch: requested {requested}, got \"{reported}\"")]
    VersionMismatch { requested: String, reported: String },

    // Rebind / test errors
    #[error("Runtime rebuild failed with {status}")]
    RebindFailure { status: String },

    #[error("Rebuilt native modules failed to import: {reason}")]
    ImportCheckFailure { reason: String },

    #[error("Test command exited with {status}")]
    TestFailure { status: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Runtime build command '{command}' not found under {base_dir}")]
    RuntimeNotFound { command: String, base_dir: PathBuf },

    #[error("No versions selected for any library family")]
    NoVersions,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed to start: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl MultisslError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// A security fault aborts extraction immediately and is reported
    /// with full detail rather than a summary line.
    pub fn is_security_fault(&self) -> bool {
        matches!(self, Self::PathTraversal { .. })
    }

    /// Whether the error counts as a test failure rather than a broken
    /// build. Test failures are recorded but never abort the batch.
    pub fn is_test_failure(&self) -> bool {
        matches!(self, Self::TestFailure { .. })
    }
}
