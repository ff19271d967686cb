//! Work sources: suppliers of (repository id, credential) pairs.
//!
//! Two interchangeable variants behind the [`Source`] trait:
//! [`LocalSource`] reads newline-delimited ids from an input stream and
//! pairs them with a locally-configured token pool; [`RemoteSource`] polls
//! a distributor endpoint that returns pre-paired assignments. The entry
//! point constructs the [`RepoSource`] enum once and hands it to the
//! worker — no environment inspection past startup.

use std::io::{self, BufRead};

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SourceError;
use crate::retry::RetryPolicy;

/// One claimed unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Repository id to archive.
    pub repo_id: u64,
    /// API token to authenticate the metadata fetch, if any.
    pub api_token: Option<String>,
}

/// Supplier of work items; `None` signals end of work.
#[async_trait]
pub trait Source: Send {
    async fn next(&mut self) -> Result<Option<WorkItem>, SourceError>;
}

/// The two production work-source variants.
pub enum RepoSource {
    Local(LocalSource),
    Remote(RemoteSource),
}

#[async_trait]
impl Source for RepoSource {
    async fn next(&mut self) -> Result<Option<WorkItem>, SourceError> {
        match self {
            RepoSource::Local(source) => source.next().await,
            RepoSource::Remote(source) => source.next().await,
        }
    }
}

/// Reads sequential repository ids from a line-oriented input stream.
///
/// Each id is paired with a token drawn uniformly at random from the
/// configured pool, or no token when the pool is empty.
pub struct LocalSource {
    lines: Box<dyn Iterator<Item = io::Result<String>> + Send>,
    tokens: Vec<String>,
}

impl LocalSource {
    /// Creates a source over an arbitrary line iterator.
    pub fn new(
        lines: Box<dyn Iterator<Item = io::Result<String>> + Send>,
        tokens: Vec<String>,
    ) -> Self {
        Self { lines, tokens }
    }

    /// Creates a source consuming the process stdin.
    pub fn from_stdin(tokens: Vec<String>) -> Self {
        Self::new(Box::new(io::BufReader::new(io::stdin()).lines()), tokens)
    }
}

#[async_trait]
impl Source for LocalSource {
    async fn next(&mut self) -> Result<Option<WorkItem>, SourceError> {
        let Some(line) = self.lines.next() else {
            return Ok(None);
        };
        let line = line?;
        let repo_id: u64 = line
            .trim()
            .parse()
            .map_err(|_| SourceError::BadLine(line.clone()))?;
        let api_token = self.tokens.choose(&mut rand::rng()).cloned();
        Ok(Some(WorkItem { repo_id, api_token }))
    }
}

/// Polls a remote distributor endpoint for pre-paired assignments.
///
/// The POST carries the worker's identity as a form field; the remote
/// side owns credential assignment per identity. Only connection-level
/// failures are retried — an HTTP error status still has its body
/// decoded, matching the in-band error convention of the rest of the
/// pipeline.
pub struct RemoteSource {
    http_client: Client,
    url: String,
    worker: String,
    retry: RetryPolicy,
}

impl RemoteSource {
    /// Creates a source polling `url` as worker `worker`.
    pub fn new(url: impl Into<String>, worker: impl Into<String>) -> Self {
        Self {
            http_client: Client::builder()
                .build()
                .expect("Failed to build HTTP client"),
            url: url.into(),
            worker: worker.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy used for distributor calls.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Source for RemoteSource {
    async fn next(&mut self) -> Result<Option<WorkItem>, SourceError> {
        let body = self
            .retry
            .run(
                || {
                    let request = self
                        .http_client
                        .post(&self.url)
                        .form(&[("worker", self.worker.as_str())]);
                    async move {
                        let response = request
                            .send()
                            .await
                            .map_err(|e| SourceError::Connection(e.to_string()))?;
                        response
                            .text()
                            .await
                            .map_err(|e| SourceError::Connection(e.to_string()))
                    }
                },
                SourceError::is_connection,
            )
            .await?;

        decode_assignment(&body)
    }
}

/// One assignment from the distributor wire protocol.
#[derive(Debug, Deserialize)]
struct Assignment {
    repo_id: u64,
    api_key: String,
}

/// Decodes a distributor response body: `null` means end of work.
fn decode_assignment(body: &str) -> Result<Option<WorkItem>, SourceError> {
    let value: Value = serde_json::from_str(body)?;
    if value.is_null() {
        return Ok(None);
    }
    let assignment: Assignment = serde_json::from_value(value)
        .map_err(|e| SourceError::Protocol(e.to_string()))?;
    Ok(Some(WorkItem {
        repo_id: assignment.repo_id,
        api_token: Some(assignment.api_key),
    }))
}
