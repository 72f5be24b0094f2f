//! Startup-time artifact loading with a bounded fetch timeout

use crate::artifacts::store::ArtifactStore;
use crate::config::{ArtifactsConfig, ModelFormat};
use crate::error::ArtifactError;
use crate::models::{model_from_artifact, ProbabilityModel};
use crate::threshold::{parse_threshold_artifact, Threshold};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const THRESHOLD_JSON: &str = "threshold.json";
pub const MODEL_JSON: &str = "model.json";
pub const MODEL_ONNX: &str = "model.onnx";

/// `prefix` without trailing slashes, joined to `name` with a single slash.
pub fn artifact_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Loads the threshold and model artifacts of one training run.
pub struct ArtifactLoader {
    store: Arc<dyn ArtifactStore>,
    bucket: String,
    prefix: String,
    timeout: Duration,
}

impl ArtifactLoader {
    pub fn new(store: Arc<dyn ArtifactStore>, bucket: &str, prefix: &str, timeout: Duration) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            timeout,
        }
    }

    pub fn from_config(store: Arc<dyn ArtifactStore>, config: &ArtifactsConfig) -> Self {
        Self::new(
            store,
            &config.bucket,
            &config.prefix,
            Duration::from_millis(config.load_timeout_ms),
        )
    }

    /// Fetch one artifact, failing with `Timeout` once the deadline passes.
    pub async fn fetch(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        let key = artifact_key(&self.prefix, name);
        match tokio::time::timeout(self.timeout, self.store.get_blob(&self.bucket, &key)).await {
            Ok(result) => result,
            Err(_) => Err(ArtifactError::Timeout {
                bucket: self.bucket.clone(),
                key,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    pub async fn load_threshold(&self) -> Result<Threshold, ArtifactError> {
        let bytes = self.fetch(THRESHOLD_JSON).await?;
        let threshold = parse_threshold_artifact(&bytes)?;

        info!(
            store = %self.store.describe(),
            bucket = %self.bucket,
            key = %artifact_key(&self.prefix, THRESHOLD_JSON),
            threshold = threshold.value(),
            "Threshold loaded"
        );
        Ok(threshold)
    }

    pub async fn load_model(
        &self,
        format: ModelFormat,
        onnx_threads: usize,
    ) -> Result<Box<dyn ProbabilityModel>, ArtifactError> {
        let name = match format {
            ModelFormat::Linear => MODEL_JSON,
            ModelFormat::Onnx => MODEL_ONNX,
        };
        let bytes = self.fetch(name).await?;
        let model = model_from_artifact(format, &bytes, onnx_threads)?;

        info!(
            model = %model.name(),
            key = %artifact_key(&self.prefix, name),
            features = ?model.feature_count(),
            "Model loaded"
        );
        Ok(model)
    }
}
