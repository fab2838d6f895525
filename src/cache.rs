use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

pub const METADATA_FILE: &str = "metadata.json";
const SNAPSHOT_EXTENSION: &str = "xml";

/// Where pre-fetched feed snapshots live. Read-only from this crate's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStore {
    /// Snapshots are files in a local directory.
    Directory(PathBuf),
    /// Snapshots are served statically under a base URL.
    Remote(String),
}

/// Record written next to the snapshots by whatever produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub items: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Cache key for a feed URL: the scheme is dropped and path/query
/// punctuation becomes `_`.
pub fn cache_key(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    without_scheme
        .chars()
        .map(|c| match c {
            '/' | '?' | '&' | '=' | ':' | '#' => '_',
            other => other,
        })
        .collect()
}

pub fn snapshot_name(url: &str) -> String {
    format!("{}.{}", cache_key(url), SNAPSHOT_EXTENSION)
}

impl CacheStore {
    /// Read the raw snapshot body for `url`. `Ok(None)` means no snapshot exists.
    pub async fn read_snapshot(
        &self,
        client: &Client,
        url: &str,
    ) -> Result<Option<String>, CacheError> {
        self.read(client, &snapshot_name(url)).await
    }

    /// Read the metadata record, `Ok(None)` if the store has none.
    pub async fn metadata(&self, client: &Client) -> Result<Option<CacheMetadata>, CacheError> {
        match self.read(client, METADATA_FILE).await? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn read(&self, client: &Client, name: &str) -> Result<Option<String>, CacheError> {
        match self {
            CacheStore::Directory(dir) => match tokio::fs::read_to_string(dir.join(name)).await {
                Ok(body) => Ok(Some(body)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            CacheStore::Remote(base_url) => {
                let location = format!("{}/{}", base_url.trim_end_matches('/'), name);
                let response = client.get(&location).send().await?;
                let status = response.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if !status.is_success() {
                    return Err(CacheError::Status(status.as_u16()));
                }
                Ok(Some(response.text().await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    mod cache_key_tests {
        use super::*;

        #[test]
        fn test_strips_https_scheme() {
            assert_eq!(
                cache_key("https://www.atlanticcouncil.org/feed/"),
                "www.atlanticcouncil.org_feed_"
            );
        }

        #[test]
        fn test_strips_http_scheme() {
            assert_eq!(cache_key("http://project-syndicate.org/rss"), "project-syndicate.org_rss");
        }

        #[test]
        fn test_replaces_query_punctuation() {
            assert_eq!(
                cache_key("https://www.imf.org/en/publications/rss?language=eng"),
                "www.imf.org_en_publications_rss_language_eng"
            );
        }

        #[test]
        fn test_port_colon_replaced() {
            assert_eq!(cache_key("http://localhost:8080/a&b"), "localhost_8080_a_b");
        }

        #[test]
        fn test_snapshot_name_has_extension() {
            assert_eq!(snapshot_name("https://rhg.com/feed/"), "rhg.com_feed_.xml");
        }
    }

    mod directory_store_tests {
        use super::*;

        #[tokio::test]
        async fn test_reads_existing_snapshot() {
            let dir = tempdir().unwrap();
            std::fs::write(dir.path().join("rhg.com_feed_.xml"), "<rss/>").unwrap();
            let store = CacheStore::Directory(dir.path().to_path_buf());

            let body = store
                .read_snapshot(&Client::new(), "https://rhg.com/feed/")
                .await
                .unwrap();
            assert_eq!(body.as_deref(), Some("<rss/>"));
        }

        #[tokio::test]
        async fn test_missing_snapshot_is_none() {
            let dir = tempdir().unwrap();
            let store = CacheStore::Directory(dir.path().to_path_buf());

            let body = store
                .read_snapshot(&Client::new(), "https://rhg.com/feed/")
                .await
                .unwrap();
            assert!(body.is_none());
        }

        #[tokio::test]
        async fn test_metadata_round_trip_from_disk() {
            let dir = tempdir().unwrap();
            std::fs::write(
                dir.path().join(METADATA_FILE),
                r#"{
                    "last_update": "2024-06-01T12:00:00Z",
                    "sources": {
                        "https://rhg.com/feed/": { "ok": true, "items": 10 },
                        "https://dead.example.com/rss": { "ok": false, "error": "timeout" }
                    }
                }"#,
            )
            .unwrap();
            let store = CacheStore::Directory(dir.path().to_path_buf());

            let metadata = store.metadata(&Client::new()).await.unwrap().unwrap();
            assert!(metadata.last_update.is_some());
            assert_eq!(metadata.sources.len(), 2);
            assert!(metadata.sources["https://rhg.com/feed/"].ok);
            assert_eq!(
                metadata.sources["https://dead.example.com/rss"].error.as_deref(),
                Some("timeout")
            );
        }

        #[tokio::test]
        async fn test_missing_metadata_is_none() {
            let dir = tempdir().unwrap();
            let store = CacheStore::Directory(dir.path().to_path_buf());
            assert!(store.metadata(&Client::new()).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_corrupt_metadata_is_error() {
            let dir = tempdir().unwrap();
            std::fs::write(dir.path().join(METADATA_FILE), "not json").unwrap();
            let store = CacheStore::Directory(dir.path().to_path_buf());
            assert!(store.metadata(&Client::new()).await.is_err());
        }
    }
}
