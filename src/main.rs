//! repograb CLI entry point.
//!
//! Initializes logging, resolves the configuration into explicit
//! capabilities, and runs the worker loop until end of work or shutdown.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repograb::archiver::GitArchiver;
use repograb::config::{Cli, SourceKind, UploaderKind};
use repograb::fetcher::GithubFetcher;
use repograb::source::{LocalSource, RemoteSource, RepoSource, Source};
use repograb::uploader::{NoopUploader, TerastashUploader, Uploader};
use repograb::worker::{stop_file_check, Worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with environment filter
    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    let source: Box<dyn Source> = Box::new(match cli.source_kind() {
        SourceKind::Distributor(url) => {
            RepoSource::Remote(RemoteSource::new(url, cli.worker_identity()?))
        }
        SourceKind::Stdin => RepoSource::Local(LocalSource::from_stdin(cli.token_pool())),
    });

    let uploader: Box<dyn Uploader> = match cli.uploader_kind()? {
        UploaderKind::Noop => Box::new(NoopUploader),
        UploaderKind::Terastash => Box::new(TerastashUploader),
    };

    let mut worker = Worker::new(
        source,
        Box::new(GithubFetcher::new()),
        Box::new(GitArchiver::new(
            cli.work_dir.clone(),
            cli.host_identity(),
        )),
        uploader,
        stop_file_check(cli.stop_file.clone()),
    );

    let summary = worker.run().await?;
    tracing::info!(
        claimed = summary.claimed,
        archived = summary.archived,
        not_found = summary.not_found,
        blocked = summary.blocked,
        unwanted = summary.unwanted,
        "Worker finished"
    );
    Ok(())
}
