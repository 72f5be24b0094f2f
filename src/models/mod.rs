//! Probability models the decision service invokes on raw features

pub mod linear;
pub mod onnx;

pub use linear::{FitParams, LogisticModel};
pub use onnx::OnnxModel;

use crate::config::ModelFormat;
use crate::error::ArtifactError;
use anyhow::Result;

/// A trained classifier producing a fraud probability for one feature row.
pub trait ProbabilityModel: Send + Sync {
    fn name(&self) -> &str;

    /// Input width when the model knows it.
    fn feature_count(&self) -> Option<usize>;

    /// Probability of the fraud class, in `[0, 1]`.
    fn predict_proba(&self, features: &[f64]) -> Result<f64>;
}

/// Decode a model artifact of the given format.
pub fn model_from_artifact(
    format: ModelFormat,
    bytes: &[u8],
    onnx_threads: usize,
) -> Result<Box<dyn ProbabilityModel>, ArtifactError> {
    match format {
        ModelFormat::Linear => Ok(Box::new(LogisticModel::from_json(bytes)?)),
        ModelFormat::Onnx => Ok(Box::new(OnnxModel::from_bytes("onnx", bytes, onnx_threads)?)),
    }
}
