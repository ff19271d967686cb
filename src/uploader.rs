//! Archival uploaders consuming populated shard directories.
//!
//! The uploader is pluggable: the no-op leaves clones on local disk for
//! an external collection pass, the terastash variant hands every file to
//! `ts add` and removes the local copy on success. Upload failures are
//! fatal to the worker by design — a partially uploaded history is not
//! safe to silently retry.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::error::UploadError;

/// Durable store for a populated shard directory.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Selector name, logged at startup.
    fn name(&self) -> &'static str;

    /// Durably stores the directory contents; on success the local copy
    /// may be removed.
    async fn upload(&self, directory: &Path) -> Result<(), UploadError>;
}

/// Uploader that leaves clones on local disk.
pub struct NoopUploader;

#[async_trait]
impl Uploader for NoopUploader {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn upload(&self, _directory: &Path) -> Result<(), UploadError> {
        Ok(())
    }
}

/// Uploader feeding every regular file to `ts add`, then removing the
/// local directory.
pub struct TerastashUploader;

#[async_trait]
impl Uploader for TerastashUploader {
    fn name(&self) -> &'static str {
        "terastash"
    }

    async fn upload(&self, directory: &Path) -> Result<(), UploadError> {
        let files = regular_files(directory)?;
        if !files.is_empty() {
            let output = Command::new("ts").arg("add").args(&files).output().await?;
            if !output.status.success() {
                return Err(UploadError::CommandFailed {
                    command: "ts add".to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
        }
        fs::remove_dir_all(directory)?;
        Ok(())
    }
}

/// Every regular file under the directory, recursively.
fn regular_files(directory: &Path) -> Result<Vec<PathBuf>, UploadError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory) {
        let entry = entry.map_err(|e| {
            UploadError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other("walk entry without io cause")
            }))
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
