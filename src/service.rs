//! Decision service: the loaded threshold plus the model that feeds it

use crate::artifacts::{ArtifactLoader, ArtifactStore};
use crate::config::AppConfig;
use crate::error::{ArtifactError, RequestError};
use crate::models::ProbabilityModel;
use crate::threshold::Threshold;
use crate::types::Decision;
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable serving state built once at startup.
///
/// Shared across request handlers behind an `Arc`; nothing in here changes
/// after construction, so concurrent readers need no synchronization.
pub struct DecisionService {
    threshold: Threshold,
    model: Box<dyn ProbabilityModel>,
    expected_features: usize,
}

impl DecisionService {
    pub fn new(
        threshold: Threshold,
        model: Box<dyn ProbabilityModel>,
        expected_features: usize,
    ) -> Self {
        if let Some(width) = model.feature_count() {
            if width != expected_features {
                warn!(
                    model_features = width,
                    expected_features = expected_features,
                    "Model input width differs from the configured feature count"
                );
            }
        }
        Self {
            threshold,
            model,
            expected_features,
        }
    }

    /// Load threshold and model from the store. Any failure is returned to
    /// the caller, which must not start serving.
    pub async fn load(
        store: Arc<dyn ArtifactStore>,
        config: &AppConfig,
    ) -> Result<Self, ArtifactError> {
        let loader = ArtifactLoader::from_config(store, &config.artifacts);
        let threshold = loader.load_threshold().await?;
        let model = loader
            .load_model(config.artifacts.model_format, config.artifacts.onnx_threads)
            .await?;

        let width = model.feature_count();
        if let Some(width) = width.filter(|&w| w != config.scoring.expected_features) {
            return Err(ArtifactError::MalformedModelArtifact(format!(
                "model takes {} features but scoring.expected_features is {}",
                width, config.scoring.expected_features
            )));
        }

        info!(
            threshold = threshold.value(),
            expected_features = config.scoring.expected_features,
            "Decision service ready"
        );
        Ok(Self::new(threshold, model, config.scoring.expected_features))
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn expected_features(&self) -> usize {
        self.expected_features
    }

    /// Decide on an already computed probability.
    pub fn decide(&self, probability: f64) -> Result<Decision, RequestError> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(RequestError::InvalidProbability(probability));
        }
        Ok(Decision {
            probability,
            is_fraud: self.threshold.decide(probability),
            threshold: self.threshold.value(),
        })
    }

    /// Run the model on a raw feature row and decide on its probability.
    pub fn score(&self, features: &[f64]) -> Result<Decision, RequestError> {
        if features.len() != self.expected_features {
            return Err(RequestError::FeatureCountMismatch {
                expected: self.expected_features,
                actual: features.len(),
            });
        }
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(RequestError::NonFiniteFeature { index });
        }

        let probability = self
            .model
            .predict_proba(features)
            .map_err(|e| RequestError::Inference(e.to_string()))?;
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(RequestError::Inference(format!(
                "model {} returned probability {}",
                self.model.name(),
                probability
            )));
        }
        self.decide(probability)
    }
}
