//! CLI and environment configuration for the worker.
//!
//! Every option has an environment fallback so deployments can stay
//! flag-free: `GRAB_REPOS_SOURCE`, `GRAB_REPOS_UPLOADER`,
//! `GRAB_REPOS_WORKER`, and `GITHUB_API_TOKENS` match the knobs of the
//! original deployment. The entry point resolves these once into explicit
//! capability values; nothing re-reads the environment afterwards.

use clap::Parser;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Default host identity when none is configured.
const UNKNOWN_HOST: &str = "unknown-host";

/// Distributed GitHub repository archival worker.
#[derive(Parser, Debug)]
#[command(name = "repograb")]
#[command(about = "Claim repository ids, mirror-clone them, and archive the result")]
#[command(version)]
pub struct Cli {
    /// Work source: an http(s):// distributor URL, or "stdin" for
    /// newline-delimited repository ids on standard input.
    #[arg(long, env = "GRAB_REPOS_SOURCE", default_value = "stdin")]
    pub source: String,

    /// Archival uploader: "noop" leaves clones on disk, "terastash"
    /// hands them to `ts add`.
    #[arg(long, env = "GRAB_REPOS_UPLOADER", default_value = "noop")]
    pub uploader: String,

    /// Worker identity sent to the distributor for credential assignment.
    #[arg(long, env = "GRAB_REPOS_WORKER")]
    pub worker: Option<String>,

    /// Whitespace-separated GitHub API token pool (stdin source only).
    #[arg(long, env = "GITHUB_API_TOKENS", hide_env_values = true)]
    pub tokens: Option<String>,

    /// Directory under which shard paths are created.
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Marker file checked before each unit of work; its presence
    /// triggers graceful shutdown.
    #[arg(long, default_value = "stop")]
    pub stop_file: PathBuf,

    /// Host identity recorded in archive manifests.
    #[arg(long, env = "HOSTNAME")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Which work-source variant the configuration selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Newline-delimited ids on stdin, tokens from the local pool.
    Stdin,
    /// Remote distributor at this URL.
    Distributor(String),
}

/// Which uploader the configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploaderKind {
    Noop,
    Terastash,
}

impl Cli {
    /// A URL prefix selects the distributor variant; anything else is
    /// the stdin variant.
    pub fn source_kind(&self) -> SourceKind {
        if self.source.starts_with("http://") || self.source.starts_with("https://") {
            SourceKind::Distributor(self.source.clone())
        } else {
            SourceKind::Stdin
        }
    }

    pub fn uploader_kind(&self) -> Result<UploaderKind, ConfigError> {
        match self.uploader.as_str() {
            "noop" => Ok(UploaderKind::Noop),
            "terastash" => Ok(UploaderKind::Terastash),
            other => Err(ConfigError::UnknownUploader(other.to_string())),
        }
    }

    /// The configured API token pool, possibly empty.
    pub fn token_pool(&self) -> Vec<String> {
        self.tokens
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// The worker identity, required only for the distributor source.
    pub fn worker_identity(&self) -> Result<String, ConfigError> {
        self.worker
            .clone()
            .ok_or(ConfigError::MissingWorkerIdentity)
    }

    /// Host identity for archive manifests.
    pub fn host_identity(&self) -> String {
        self.host
            .clone()
            .unwrap_or_else(|| UNKNOWN_HOST.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("repograb").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.source_kind(), SourceKind::Stdin);
        assert_eq!(cli.uploader_kind().unwrap(), UploaderKind::Noop);
        assert!(cli.token_pool().is_empty());
        assert_eq!(cli.stop_file, PathBuf::from("stop"));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_url_source_selects_distributor() {
        let cli = parse(&["--source", "http://dist.example/next"]);
        assert_eq!(
            cli.source_kind(),
            SourceKind::Distributor("http://dist.example/next".to_string())
        );

        let cli = parse(&["--source", "https://dist.example/next"]);
        assert!(matches!(cli.source_kind(), SourceKind::Distributor(_)));

        let cli = parse(&["--source", "ids.txt"]);
        assert_eq!(cli.source_kind(), SourceKind::Stdin);
    }

    #[test]
    fn test_uploader_selection() {
        let cli = parse(&["--uploader", "terastash"]);
        assert_eq!(cli.uploader_kind().unwrap(), UploaderKind::Terastash);

        let cli = parse(&["--uploader", "s3"]);
        assert!(matches!(
            cli.uploader_kind(),
            Err(ConfigError::UnknownUploader(_))
        ));
    }

    #[test]
    fn test_token_pool_splits_on_whitespace() {
        let cli = parse(&["--tokens", "ghp_a ghp_b\tghp_c"]);
        assert_eq!(cli.token_pool(), vec!["ghp_a", "ghp_b", "ghp_c"]);

        let cli = parse(&["--tokens", "   "]);
        assert!(cli.token_pool().is_empty());
    }

    #[test]
    fn test_worker_identity_required_only_when_asked() {
        let cli = parse(&[]);
        assert!(matches!(
            cli.worker_identity(),
            Err(ConfigError::MissingWorkerIdentity)
        ));

        let cli = parse(&["--worker", "worker1"]);
        assert_eq!(cli.worker_identity().unwrap(), "worker1");
    }

    #[test]
    fn test_host_identity_fallback() {
        let cli = parse(&["--host", "grab-03"]);
        assert_eq!(cli.host_identity(), "grab-03");
    }
}
