//! repograb: distributed GitHub repository archival worker.
//!
//! Claims repository ids from a shared work queue, fetches metadata from
//! the GitHub API, mirror-clones each repository into a sharded storage
//! layout, stamps the clone with a provenance manifest, and optionally
//! hands it to an archival uploader.

pub mod archiver;
pub mod backoff;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod metadata;
pub mod retry;
pub mod shard;
pub mod source;
pub mod uploader;
pub mod worker;

// Re-export commonly used error types
pub use error::{ArchiveError, ConfigError, FetchError, SourceError, UploadError};
