//! Blob stores the service can fetch artifacts from

use crate::error::ArtifactError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Read-only key-value blob store.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetch the blob stored under `bucket`/`key`.
    async fn get_blob(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ArtifactError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Blobs stored as files under `root/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn get_blob(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path(bucket, key);
        debug!(path = %path.display(), "Reading artifact from disk");

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ArtifactError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => ArtifactError::Unreachable {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            },
        })
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}

/// Blobs served over HTTP at `<base_url>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpArtifactStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, bucket, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn get_blob(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ArtifactError> {
        let url = self.url(bucket, key);
        debug!(url = %url, "Fetching artifact over HTTP");

        let unreachable = |reason: String| ArtifactError::Unreachable {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ArtifactError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            return Err(unreachable(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        Ok(body.to_vec())
    }

    fn describe(&self) -> String {
        format!("http:{}", self.base_url)
    }
}

/// In-process store, used for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    blobs: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob, replacing any previous value.
    pub fn insert(&self, bucket: &str, key: &str, blob: impl Into<Vec<u8>>) {
        // Each write is a single map insert, so a poisoned map is still consistent.
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        blobs.insert((bucket.to_string(), key.to_string()), blob.into());
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_blob(self, bucket: &str, key: &str, blob: impl Into<Vec<u8>>) -> Self {
        self.insert(bucket, key, blob);
        self
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn get_blob(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ArtifactError> {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);

        blobs
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let bucket_dir = dir.path().join("bucket").join("artifacts");
        std::fs::create_dir_all(&bucket_dir).unwrap();
        std::fs::write(bucket_dir.join("threshold.json"), br#"{"t": 0.7}"#).unwrap();

        let store = LocalArtifactStore::new(dir.path());
        let blob = store
            .get_blob("bucket", "artifacts/threshold.json")
            .await
            .unwrap();
        assert_eq!(blob, br#"{"t": 0.7}"#);

        let missing = store.get_blob("bucket", "artifacts/nope.json").await;
        assert!(matches!(missing, Err(ArtifactError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_memory_store_survives_poisoned_lock() {
        let store = std::sync::Arc::new(InMemoryArtifactStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.blobs.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(store.blobs.is_poisoned());

        store.insert("b", "k", "0.4");
        assert_eq!(store.get_blob("b", "k").await.unwrap(), b"0.4");
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = InMemoryArtifactStore::new().with_blob("b", "k", "0.3");
        assert_eq!(store.get_blob("b", "k").await.unwrap(), b"0.3");
        assert!(matches!(
            store.get_blob("b", "other").await,
            Err(ArtifactError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_http_store_unreachable() {
        // Nothing listens on the discard port.
        let store = HttpArtifactStore::new("http://127.0.0.1:9/");
        let result = store.get_blob("bucket", "threshold.json").await;
        assert!(matches!(result, Err(ArtifactError::Unreachable { .. })));
    }

    #[test]
    fn test_http_url_layout() {
        let store = HttpArtifactStore::new("http://artifacts.local/");
        assert_eq!(
            store.url("bucket", "/artifacts/threshold.json"),
            "http://artifacts.local/bucket/artifacts/threshold.json"
        );
    }
}
