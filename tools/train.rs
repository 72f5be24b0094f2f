//! Model Trainer
//!
//! Fits the fraud model on a labelled CSV, selects the decision threshold
//! under the configured precision floor and writes three artifacts:
//! `model.json`, `threshold.json` and `metrics.json`.
//!
//! Usage: train [config_path] [data_path] [min_precision]

use anyhow::{Context, Result};
use fraud_threshold_service::{config::AppConfig, logging, training::TrainingPipeline};
use tracing::{info, warn};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or(fraud_threshold_service::config::DEFAULT_CONFIG_PATH);

    let mut config = AppConfig::load_from_path(config_path)?;
    if let Some(data_path) = args.get(2) {
        config.training.data_path = data_path.clone();
    }
    if let Some(min_precision) = args.get(3) {
        config.training.min_precision = min_precision
            .parse()
            .with_context(|| format!("Invalid min_precision {:?}", min_precision))?;
    }
    config.validate()?;

    logging::init(&config.logging, "train")?;

    info!(
        data_path = %config.training.data_path,
        min_precision = config.training.min_precision,
        test_size = config.training.test_size,
        seed = config.training.seed,
        "Starting training run"
    );

    let outcome = TrainingPipeline::new(config.training.clone()).run()?;

    if outcome.selection.is_fallback() {
        warn!(
            threshold = outcome.report.threshold,
            "No threshold met the precision floor; review before deploying"
        );
    }

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}
