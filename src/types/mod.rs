//! Type definitions shared by the selector, training pipeline and service

pub mod artifact;
pub mod example;
pub mod scoring;

pub use artifact::{MetricsReport, ThresholdArtifact, ThresholdStatus};
pub use example::ScoredExample;
pub use scoring::{DecideRequest, Decision, HealthResponse, ScoreRequest};
