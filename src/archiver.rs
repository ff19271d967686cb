//! Mirror-clone archival of repositories into sharded storage.
//!
//! The destroy-then-clone sequence is crash-safe by construction: a stale
//! target from a previous attempt is fully removed before cloning, so
//! retrying the whole sequence is always safe.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ArchiveError;
use crate::metadata::{ArchiveManifest, RepoMetadata};
use crate::shard::{shard_path, SHARD_PATH_LEN};

/// Provenance manifest filename inside every clone.
pub const MANIFEST_FILE: &str = "metadata.json";

/// Default clone URL base.
const DEFAULT_CLONE_BASE: &str = "https://github.com";

/// Produces an archived clone from validated metadata.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archives one repository, returning the populated shard directory.
    async fn archive(&self, metadata: &RepoMetadata) -> Result<PathBuf, ArchiveError>;
}

/// Archiver shelling out to the git command-line tool.
pub struct GitArchiver {
    work_dir: PathBuf,
    clone_base: String,
    fetched_by: String,
}

impl GitArchiver {
    /// Creates an archiver rooted at `work_dir`, stamping manifests with
    /// `fetched_by` as the producing host.
    pub fn new(work_dir: impl Into<PathBuf>, fetched_by: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            clone_base: DEFAULT_CLONE_BASE.to_string(),
            fetched_by: fetched_by.into(),
        }
    }

    /// Overrides the clone URL base (tests clone from a local fixture).
    pub fn with_clone_base(mut self, clone_base: impl Into<String>) -> Self {
        self.clone_base = clone_base.into();
        self
    }
}

#[async_trait]
impl Archiver for GitArchiver {
    async fn archive(&self, metadata: &RepoMetadata) -> Result<PathBuf, ArchiveError> {
        let shard = shard_path(metadata.id());
        // Exact-length check before the recursive delete below.
        if shard.len() != SHARD_PATH_LEN {
            return Err(ArchiveError::SuspiciousPath(shard));
        }
        let target = self.work_dir.join(&shard);

        remove_stale(&target)?;

        let url = format!("{}/{}", self.clone_base, metadata.full_name());
        let git_version = git_version().await?;

        let target_str = target.to_string_lossy();
        run_git(
            &["clone", "--quiet", "--mirror", url.as_str(), target_str.as_ref()],
            None,
        )
        .await?;

        if has_unpacked_objects(&target)? {
            run_git(&["repack", "-q", "-A", "-d"], Some(&target)).await?;
        }

        // Housekeeping files a bare archival mirror does not need.
        fs::remove_file(target.join("description"))?;
        fs::remove_dir_all(target.join("hooks"))?;
        fs::remove_dir_all(target.join("info"))?;

        let manifest = ArchiveManifest::new(metadata.clone(), &self.fetched_by, git_version);
        write_manifest(&target, &manifest)?;

        if !target.is_dir() {
            return Err(ArchiveError::MissingTarget(target));
        }
        Ok(target)
    }
}

/// Removes a stale target directory; absence is not an error.
fn remove_stale(target: &Path) -> Result<(), ArchiveError> {
    match fs::remove_dir_all(target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    if target.exists() {
        return Err(ArchiveError::StaleTarget(target.to_path_buf()));
    }
    Ok(())
}

/// True when the object store holds anything besides the `info` and
/// `pack` subdirectories, meaning the clone left loose objects behind.
fn has_unpacked_objects(target: &Path) -> Result<bool, ArchiveError> {
    for entry in fs::read_dir(target.join("objects"))? {
        let name = entry?.file_name();
        if name != "info" && name != "pack" {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Writes the manifest with create-new semantics; a pre-existing manifest
/// means this path was already archived and must not be rewritten.
fn write_manifest(target: &Path, manifest: &ArchiveManifest) -> Result<(), ArchiveError> {
    let path = target.join(MANIFEST_FILE);
    let file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ArchiveError::ManifestExists(path));
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::to_writer(file, manifest)?;
    Ok(())
}

/// Runs a git subcommand, failing on non-zero exit.
async fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<std::process::Output, ArchiveError> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let output = command.output().await?;
    if !output.status.success() {
        return Err(ArchiveError::Git {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Trimmed output of `git --version` for the provenance manifest.
pub async fn git_version() -> Result<String, ArchiveError> {
    let output = run_git(&["--version"], None).await?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
