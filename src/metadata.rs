//! Repository metadata and the provenance manifest.
//!
//! This module defines the filtered GitHub metadata object stored alongside
//! every mirror clone, the URL-field filter applied to it, and the
//! `metadata.json` manifest format.

use chrono::Utc;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::FetchError;

/// `*_url` fields that survive filtering. Everything else ending in
/// `_url`, and the bare `url` field, is an API hyperlink not worth
/// archiving.
const URL_FIELD_ALLOWLIST: [&str; 2] = ["avatar_url", "mirror_url"];

/// Validated, URL-filtered metadata for one repository.
///
/// Constructed fresh per fetch via [`RepoMetadata::from_value`]; never
/// mutated afterwards. Serializes transparently as the filtered JSON
/// object.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoMetadata {
    id: u64,
    full_name: String,
    fork: bool,
    fields: Map<String, Value>,
}

impl RepoMetadata {
    /// Filters and validates a raw GitHub API object.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Invalid` if the value is not a JSON object or
    /// is missing `id`, `full_name`, or `fork`.
    pub fn from_value(value: Value) -> Result<Self, FetchError> {
        let Value::Object(raw) = value else {
            return Err(FetchError::Invalid("expected a JSON object".to_string()));
        };
        let fields = filter_url_fields(&raw);

        let id = fields
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| FetchError::Invalid("missing integer field \"id\"".to_string()))?;
        let full_name = fields
            .get("full_name")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::Invalid("missing string field \"full_name\"".to_string()))?
            .to_string();
        let fork = fields
            .get("fork")
            .and_then(Value::as_bool)
            .ok_or_else(|| FetchError::Invalid("missing boolean field \"fork\"".to_string()))?;

        Ok(Self {
            id,
            full_name,
            fork,
            fields,
        })
    }

    /// The repository id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The `owner/name` repository path.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Whether the repository is a fork.
    pub fn fork(&self) -> bool {
        self.fork
    }

    /// Access to any surviving metadata field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The full filtered field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Serialize for RepoMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Drops API hyperlink fields, recursing into the `owner` sub-object.
fn filter_url_fields(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut filtered = Map::new();
    for (key, value) in raw {
        if key == "url"
            || (key.ends_with("_url") && !URL_FIELD_ALLOWLIST.contains(&key.as_str()))
        {
            continue;
        }
        if key == "owner" {
            if let Value::Object(owner) = value {
                filtered.insert(key.clone(), Value::Object(filter_url_fields(owner)));
                continue;
            }
        }
        filtered.insert(key.clone(), value.clone());
    }
    filtered
}

/// Provenance manifest written as `metadata.json` inside every clone.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveManifest {
    /// The filtered forge metadata, keyed by the API host it came from.
    #[serde(rename = "api.github.com")]
    pub forge_metadata: RepoMetadata,
    /// ISO-8601 UTC fetch timestamp, second precision.
    pub fetched_at: String,
    /// Host identity of the worker that produced the clone.
    pub fetched_by: String,
    /// repograb version that produced the clone.
    pub grab_version: String,
    /// Output of `git --version` on the producing host.
    pub git_version: String,
}

impl ArchiveManifest {
    /// Builds a manifest stamped with the current time and crate version.
    pub fn new(
        forge_metadata: RepoMetadata,
        fetched_by: impl Into<String>,
        git_version: impl Into<String>,
    ) -> Self {
        Self {
            forge_metadata,
            fetched_at: iso_utc_now(),
            fetched_by: fetched_by.into(),
            grab_version: env!("CARGO_PKG_VERSION").to_string(),
            git_version: git_version.into(),
        }
    }
}

/// Current UTC time as ISO-8601 with second precision and trailing `Z`.
pub fn iso_utc_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_repo() -> Value {
        json!({
            "id": 42,
            "full_name": "octocat/hello",
            "fork": false,
            "url": "https://api.github.com/repos/octocat/hello",
            "forks_url": "https://api.github.com/repos/octocat/hello/forks",
            "mirror_url": "https://mirror.example/hello.git",
            "description": "A greeting",
            "owner": {
                "login": "octocat",
                "id": 1,
                "url": "https://api.github.com/users/octocat",
                "avatar_url": "https://avatars.example/1",
                "followers_url": "https://api.github.com/users/octocat/followers"
            }
        })
    }

    #[test]
    fn test_filter_drops_url_fields() {
        let metadata = RepoMetadata::from_value(sample_repo()).expect("valid metadata");
        assert!(metadata.get("url").is_none());
        assert!(metadata.get("forks_url").is_none());
        assert_eq!(
            metadata.get("mirror_url"),
            Some(&json!("https://mirror.example/hello.git"))
        );
        assert_eq!(metadata.get("description"), Some(&json!("A greeting")));
    }

    #[test]
    fn test_filter_recurses_into_owner() {
        let metadata = RepoMetadata::from_value(sample_repo()).expect("valid metadata");
        let owner = metadata.get("owner").and_then(Value::as_object).unwrap();
        assert!(owner.get("url").is_none());
        assert!(owner.get("followers_url").is_none());
        assert_eq!(owner.get("avatar_url"), Some(&json!("https://avatars.example/1")));
        assert_eq!(owner.get("login"), Some(&json!("octocat")));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let once = RepoMetadata::from_value(sample_repo()).expect("valid metadata");
        let twice =
            RepoMetadata::from_value(Value::Object(once.fields().clone())).expect("still valid");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(
            RepoMetadata::from_value(sample_repo()).unwrap().id(),
            42
        );

        let mut missing_id = sample_repo();
        missing_id.as_object_mut().unwrap().remove("id");
        assert!(matches!(
            RepoMetadata::from_value(missing_id),
            Err(FetchError::Invalid(_))
        ));

        let mut missing_fork = sample_repo();
        missing_fork.as_object_mut().unwrap().remove("fork");
        assert!(matches!(
            RepoMetadata::from_value(missing_fork),
            Err(FetchError::Invalid(_))
        ));

        assert!(matches!(
            RepoMetadata::from_value(json!([1, 2, 3])),
            Err(FetchError::Invalid(_))
        ));
    }

    #[test]
    fn test_accessors() {
        let metadata = RepoMetadata::from_value(sample_repo()).expect("valid metadata");
        assert_eq!(metadata.id(), 42);
        assert_eq!(metadata.full_name(), "octocat/hello");
        assert!(!metadata.fork());
    }

    #[test]
    fn test_metadata_serializes_transparently() {
        let metadata = RepoMetadata::from_value(sample_repo()).expect("valid metadata");
        let value = serde_json::to_value(&metadata).expect("serializable");
        assert!(value.is_object());
        assert_eq!(value.get("full_name"), Some(&json!("octocat/hello")));
        assert!(value.get("url").is_none());
    }

    #[test]
    fn test_manifest_shape() {
        let metadata = RepoMetadata::from_value(sample_repo()).expect("valid metadata");
        let manifest = ArchiveManifest::new(metadata, "worker-host", "git version 2.44.0");
        let value = serde_json::to_value(&manifest).expect("serializable");

        assert_eq!(
            value["api.github.com"]["full_name"],
            json!("octocat/hello")
        );
        assert_eq!(value["fetched_by"], json!("worker-host"));
        assert_eq!(value["git_version"], json!("git version 2.44.0"));
        assert_eq!(value["grab_version"], json!(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_iso_timestamp_shape() {
        let stamp = iso_utc_now();
        // e.g. 2026-08-28T12:34:56Z
        assert_eq!(stamp.len(), 20);
        assert!(stamp.ends_with('Z'));
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], "T");
        assert!(!stamp.contains('.'), "second precision only");
    }
}
