//! Fraud Threshold Service Library
//!
//! Offline selection of a precision-constrained fraud decision threshold,
//! and an online service that applies it to model probabilities.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod server;
pub mod service;
pub mod threshold;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use error::{ArtifactError, RequestError, SelectionError};
pub use service::DecisionService;
pub use threshold::{select_threshold, Threshold, ThresholdSelection};
pub use types::{Decision, ScoredExample};
