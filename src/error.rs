//! Error types for threshold selection, artifact loading and request handling.

use thiserror::Error;

/// Invalid input handed to the threshold selector.
#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("min_precision must lie in [0, 1], got {0}")]
    InvalidMinPrecision(f64),

    #[error("probability must be a finite value in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("label must be 0 or 1, got {0}")]
    InvalidLabel(u8),

    #[error("{probabilities} probabilities but {labels} labels")]
    LengthMismatch { probabilities: usize, labels: usize },
}

/// Failures while fetching or decoding artifacts. All of these are fatal at
/// service startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("artifact store unreachable for {bucket}/{key}: {reason}")]
    Unreachable {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("timed out after {timeout_ms}ms fetching {bucket}/{key}")]
    Timeout {
        bucket: String,
        key: String,
        timeout_ms: u64,
    },

    #[error("malformed threshold artifact: {0}")]
    MalformedThresholdArtifact(String),

    #[error("malformed model artifact: {0}")]
    MalformedModelArtifact(String),
}

impl ArtifactError {
    /// Whether the failure came from reaching the store rather than from its content.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ArtifactError::Unreachable { .. } | ArtifactError::Timeout { .. }
        )
    }
}

/// Per-request failures. These reject a single request and never touch
/// shared service state.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Forbidden")]
    Unauthorized,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Feature at index {index} is not a finite number")]
    NonFiniteFeature { index: usize },

    #[error("Probability must be a finite value in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl RequestError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Unauthorized => "unauthorized",
            RequestError::InvalidBody(_) => "invalid_body",
            RequestError::FeatureCountMismatch { .. } => "feature_count_mismatch",
            RequestError::NonFiniteFeature { .. } => "non_finite_feature",
            RequestError::InvalidProbability(_) => "invalid_probability",
            RequestError::Inference(_) => "inference",
        }
    }

    /// Whether the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RequestError::Inference(_))
    }
}
