//! Repository metadata fetching from the GitHub REST API.
//!
//! [`GithubFetcher`] calls `GET /repositories/{id}` and classifies the
//! response into success / not-found / access-blocked / other-error.
//! Only transport failures are retryable; classification happens on the
//! response body so HTTP error statuses never raise on their own.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::FetchError;
use crate::metadata::RepoMetadata;

/// GitHub REST API base URL.
const GITHUB_API_BASE: &str = "https://api.github.com";

/// User-Agent sent on every API call; GitHub rejects anonymous agents.
const USER_AGENT: &str = concat!("repograb/", env!("CARGO_PKG_VERSION"));

/// Supplier of validated repository metadata.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches and filters metadata for one repository id.
    async fn fetch(&self, id: u64, token: Option<&str>) -> Result<RepoMetadata, FetchError>;
}

/// Fetcher backed by the GitHub REST API.
pub struct GithubFetcher {
    http_client: Client,
    api_base: String,
}

impl GithubFetcher {
    /// Creates a fetcher against the production GitHub API.
    pub fn new() -> Self {
        Self::with_api_base(GITHUB_API_BASE)
    }

    /// Creates a fetcher against an alternate API base URL.
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            // No request timeout: the worker tolerates slow calls and the
            // surrounding retry loop owns failure handling.
            http_client: Client::builder()
                .build()
                .expect("Failed to build HTTP client"),
            api_base: api_base.into(),
        }
    }
}

impl Default for GithubFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for GithubFetcher {
    async fn fetch(&self, id: u64, token: Option<&str>) -> Result<RepoMetadata, FetchError> {
        let url = format!("{}/repositories/{}", self.api_base, id);

        let mut request = self
            .http_client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);

        if let Some(token) = token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        decode_metadata_response(&body)
    }
}

/// Classifies an API response body.
///
/// GitHub reports errors in-band as `{"message": ...}` objects, so the
/// body is decoded regardless of HTTP status.
fn decode_metadata_response(body: &str) -> Result<RepoMetadata, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return Err(match message {
            "Not Found" => FetchError::NotFound,
            // e.g. https://api.github.com/repositories/738
            "Repository access blocked" => FetchError::AccessBlocked,
            other => FetchError::Api(other.to_string()),
        });
    }

    RepoMetadata::from_value(value)
}
