//! Configuration management for training and serving

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Serialized form of the trained model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Logistic regression JSON produced by the bundled trainer
    #[default]
    Linear,
    /// ONNX graph exported by an external trainer
    Onnx,
}

/// Where the service fetches artifacts from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Files under `artifacts.root/<bucket>/<key>`
    #[default]
    Local,
    /// `GET <artifacts.root>/<bucket>/<key>`
    Http,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub server: ServerConfig,
    pub scoring: ScoringConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Artifact store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Store backend
    pub store: StoreKind,
    /// Local directory or base URL of the store
    pub root: String,
    /// Bucket holding the artifacts
    pub bucket: String,
    /// Key prefix of the training run (e.g. "artifacts/")
    pub prefix: String,
    /// Upper bound on each startup fetch
    pub load_timeout_ms: u64,
    pub model_format: ModelFormat,
    /// Intra-op threads for ONNX inference
    pub onnx_threads: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Shared secret expected in the `x-api-key` header
    pub api_key: String,
    /// Seconds between metrics summaries in the log (0 disables)
    pub metrics_interval_secs: u64,
}

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Number of features every raw scoring request must carry
    pub expected_features: usize,
}

/// Offline training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Labelled CSV dataset
    pub data_path: String,
    pub label_column: String,
    /// Directory receiving model.json and threshold.json
    pub output_dir: String,
    /// Directory receiving metrics.json
    pub reports_dir: String,
    /// Precision floor for threshold selection
    pub min_precision: f64,
    /// Held-out fraction
    pub test_size: f64,
    pub seed: u64,
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `FRAUD_CONFIG` or the default path.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("FRAUD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration layered as defaults, optional file, `FRAUD__*`
    /// variables, then the legacy `S3_BUCKET`/`ARTIFACT_PREFIX`/`API_KEY`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(
                Config::try_from(&AppConfig::default()).context("Failed to encode defaults")?,
            )
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("FRAUD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("artifacts.bucket", std::env::var("S3_BUCKET").ok())?
            .set_override_option("artifacts.prefix", std::env::var("ARTIFACT_PREFIX").ok())?
            .set_override_option("server.api_key", std::env::var("API_KEY").ok())?
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service or trainer cannot run with.
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        ensure!(
            (0.0..=1.0).contains(&t.min_precision),
            "training.min_precision must lie in [0, 1], got {}",
            t.min_precision
        );
        ensure!(
            t.test_size > 0.0 && t.test_size < 1.0,
            "training.test_size must lie in (0, 1), got {}",
            t.test_size
        );
        ensure!(t.epochs > 0, "training.epochs must be positive");
        ensure!(
            self.scoring.expected_features > 0,
            "scoring.expected_features must be positive"
        );
        ensure!(!self.server.api_key.is_empty(), "server.api_key must not be empty");
        ensure!(
            self.artifacts.load_timeout_ms > 0,
            "artifacts.load_timeout_ms must be positive"
        );
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactsConfig {
                store: StoreKind::Local,
                root: "store".to_string(),
                bucket: "nikos-fraud-artifacts-2025".to_string(),
                prefix: "artifacts/".to_string(),
                load_timeout_ms: 10_000,
                model_format: ModelFormat::Linear,
                onnx_threads: 1,
            },
            server: ServerConfig {
                bind_addr: "0.0.0.0:8000".to_string(),
                api_key: "demo123".to_string(),
                metrics_interval_secs: 30,
            },
            scoring: ScoringConfig {
                expected_features: 30,
            },
            training: TrainingConfig {
                data_path: "data/creditcard.csv".to_string(),
                label_column: "Class".to_string(),
                output_dir: "store/nikos-fraud-artifacts-2025/artifacts".to_string(),
                reports_dir: "reports".to_string(),
                min_precision: 0.90,
                test_size: 0.15,
                seed: 42,
                epochs: 300,
                learning_rate: 0.1,
                l2: 1e-4,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
