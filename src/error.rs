//! Error types for tuxcache
//!
//! All modules use `CacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tuxcache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in tuxcache
#[derive(Error, Debug)]
pub enum CacheError {
    // Input and configuration errors
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Fingerprint errors
    #[error(
        "Could not get git sha from tree {repo} at ref {git_ref}.\n\
         git ls-remote returned: {output:?}\n\
         which doesn't match this pattern: {pattern}"
    )]
    RefResolution {
        repo: String,
        git_ref: String,
        pattern: String,
        output: String,
    },

    #[error("Compiler {compiler} reported no version information")]
    CompilerVersion { compiler: String },

    // Cache store errors
    #[error("Malformed cache entry {key}: {reason}\nThe current cache looks as follows:\n{raw}")]
    MalformedCache {
        key: String,
        reason: String,
        raw: String,
    },

    #[error("Remote store error during {operation}: {reason}")]
    RemoteStore { operation: String, reason: String },

    #[error("No cache entry with key {0} to update")]
    EntryNotFound(String),

    // Build batch errors
    #[error("No builds present in {0}. Did Tuxsuite run?")]
    EmptyBatch(PathBuf),

    #[error(
        "Could not find a suitable git sha or compiler version in any build\n\
         Here's the builds file:\n{raw}"
    )]
    MetadataExtraction { raw: String },

    #[error("Unable to find {0}")]
    BuildsFileMissing(PathBuf),

    #[error("{0} is zero sized")]
    BuildsFileEmpty(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
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

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a remote store error
    pub fn remote(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::RemoteStore {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RefResolution { .. } => Some(
                "Expecting something like: be59bee58790f9d137cfc11973e856e4f8ab3888\trefs/tags/v6.7-rc5",
            ),
            Self::MalformedCache { .. } => {
                Some("Delete the repository variable or run: tuxcache check --purge-cache")
            }
            Self::BuildsFileMissing(_) => Some("Artifact not saved? Check the Tuxsuite step"),
            Self::EntryNotFound(_) => Some("The pre-flight check creates entries: run tuxcache check first"),
            _ => None,
        }
    }
}
