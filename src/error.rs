//! Error types for repograb operations.
//!
//! Defines one error enum per subsystem:
//! - Metadata fetching from the GitHub API
//! - Work-source acquisition (stdin or distributor)
//! - Repository archival (clone, repack, manifest)
//! - Archival upload
//! - Configuration parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching repository metadata.
///
/// Only `Connection` is transient; callers retry it and treat every
/// other variant as a permanent classification of the repository.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API reports no repository for this id.
    #[error("Repository not found")]
    NotFound,

    /// The API refuses to serve this repository.
    #[error("Repository access blocked")]
    AccessBlocked,

    /// Any other error message reported by the API.
    #[error("GitHub API error: {0}")]
    Api(String),

    /// Transport-level failure before a body could be read.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The response body was not valid JSON.
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// The metadata object is missing a required field.
    #[error("Invalid repository metadata: {0}")]
    Invalid(String),
}

impl FetchError {
    /// Returns true for the single retryable variant.
    pub fn is_connection(&self) -> bool {
        matches!(self, FetchError::Connection(_))
    }
}

/// Errors that can occur while obtaining the next unit of work.
#[derive(Debug, Error)]
pub enum SourceError {
    /// An input line could not be parsed as a repository id.
    #[error("Invalid repository id line: {0:?}")]
    BadLine(String),

    /// Transport-level failure talking to the distributor.
    #[error("Distributor connection failed: {0}")]
    Connection(String),

    /// The distributor response did not match the wire protocol.
    #[error("Unexpected distributor response: {0}")]
    Protocol(String),

    /// IO error reading the local input stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding of the distributor response failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Returns true for the single retryable variant.
    pub fn is_connection(&self) -> bool {
        matches!(self, SourceError::Connection(_))
    }
}

/// Errors that can occur during the destroy/clone/manifest sequence.
///
/// Every variant is retryable as a whole unit: the archiver's idempotent
/// cleanup makes it safe to restart the sequence from scratch.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The computed shard path did not have the expected fixed length.
    /// Refusing to touch it guards the recursive delete that follows.
    #[error("Refusing to operate on suspicious shard path: {0:?}")]
    SuspiciousPath(String),

    /// A stale target directory survived the cleanup pass.
    #[error("Stale target still present after removal: {0}")]
    StaleTarget(PathBuf),

    /// A git subprocess exited non-zero.
    #[error("{command} failed: {stderr}")]
    Git { command: String, stderr: String },

    /// The provenance manifest already exists in the target directory.
    #[error("Manifest already present: {0}")]
    ManifestExists(PathBuf),

    /// The target directory is missing after a clone reported success.
    #[error("Clone target missing: {0}")]
    MissingTarget(PathBuf),

    /// IO error during cleanup, inspection, or manifest writing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while handing a clone to the archival uploader.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload command exited non-zero.
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// IO error enumerating files or removing the uploaded directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while interpreting the worker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The uploader selector was not a recognized name.
    #[error("Unknown uploader {0:?} (expected \"noop\" or \"terastash\")")]
    UnknownUploader(String),

    /// The distributor source requires a worker identity.
    #[error("A worker identity is required for a distributor source (set GRAB_REPOS_WORKER)")]
    MissingWorkerIdentity,
}
