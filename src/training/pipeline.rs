//! End-to-end training run producing the model, threshold and metrics artifacts

use crate::artifacts::{MODEL_JSON, THRESHOLD_JSON};
use crate::config::TrainingConfig;
use crate::evaluation::{average_precision, ClassificationReport, ConfusionMatrix};
use crate::models::{FitParams, LogisticModel};
use crate::threshold::{select_threshold, ThresholdSelection};
use crate::training::dataset::Dataset;
use crate::training::split::stratified_split;
use crate::types::{MetricsReport, ScoredExample, ThresholdArtifact};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the metrics report inside the reports directory
pub const METRICS_JSON: &str = "metrics.json";

/// Everything a training run produced
#[derive(Debug)]
pub struct TrainingOutcome {
    pub model: LogisticModel,
    pub selection: ThresholdSelection,
    pub report: MetricsReport,
    pub model_path: PathBuf,
    pub threshold_path: PathBuf,
    pub metrics_path: PathBuf,
}

/// Trains, evaluates and persists one model.
pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Load the configured dataset and run the whole pipeline.
    pub fn run(&self) -> Result<TrainingOutcome> {
        let dataset = Dataset::from_csv_path(&self.config.data_path, &self.config.label_column)?;
        self.run_on(&dataset)
    }

    /// Run the pipeline on an in-memory dataset.
    pub fn run_on(&self, dataset: &Dataset) -> Result<TrainingOutcome> {
        let (model, selection, report) = self.train_and_evaluate(dataset)?;

        let output_dir = Path::new(&self.config.output_dir);
        let reports_dir = Path::new(&self.config.reports_dir);
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        fs::create_dir_all(reports_dir)
            .with_context(|| format!("Failed to create {}", reports_dir.display()))?;

        let model_path = output_dir.join(MODEL_JSON);
        let threshold_path = output_dir.join(THRESHOLD_JSON);
        let metrics_path = reports_dir.join(METRICS_JSON);

        write_file(&model_path, &model.to_json()?)?;
        write_file(
            &threshold_path,
            &serde_json::to_vec(&ThresholdArtifact {
                t: selection.threshold(),
            })?,
        )?;
        write_file(&metrics_path, &serde_json::to_vec_pretty(&report)?)?;

        info!(
            model = %model_path.display(),
            threshold = %threshold_path.display(),
            metrics = %metrics_path.display(),
            "Artifacts written"
        );

        Ok(TrainingOutcome {
            model,
            selection,
            report,
            model_path,
            threshold_path,
            metrics_path,
        })
    }

    /// Split, fit, score the held-out rows and select the threshold.
    pub fn train_and_evaluate(
        &self,
        dataset: &Dataset,
    ) -> Result<(LogisticModel, ThresholdSelection, MetricsReport)> {
        let positives = dataset.positives();
        if positives == 0 || positives == dataset.len() {
            bail!(
                "dataset needs both classes to train (rows: {}, positives: {})",
                dataset.len(),
                positives
            );
        }

        let (train_idx, test_idx) =
            stratified_split(&dataset.labels, self.config.test_size, self.config.seed);
        let train = dataset.subset(&train_idx);
        let test = dataset.subset(&test_idx);
        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            test_positives = test.positives(),
            "Dataset split"
        );

        let params = FitParams {
            epochs: self.config.epochs,
            learning_rate: self.config.learning_rate,
            l2: self.config.l2,
            positive_weight: None,
        };
        let model = LogisticModel::fit(&train.rows, &train.labels, &params)?
            .with_feature_names(dataset.feature_names.clone());

        let probabilities: Vec<f64> = test.rows.iter().map(|r| model.probability(r)).collect();
        let scored = ScoredExample::from_pairs(&probabilities, &test.labels)?;

        let pr_auc = average_precision(&scored);
        let selection = select_threshold(&scored, self.config.min_precision)?;
        match selection {
            ThresholdSelection::Selected {
                threshold,
                precision,
                recall,
            } => info!(
                threshold = threshold,
                precision = precision,
                recall = recall,
                min_precision = self.config.min_precision,
                "Threshold selected"
            ),
            ThresholdSelection::Unsatisfiable {
                fallback_threshold,
                reason,
            } => warn!(
                fallback_threshold = fallback_threshold,
                reason = ?reason,
                min_precision = self.config.min_precision,
                "Precision constraint unsatisfiable, writing fallback threshold"
            ),
        }

        let threshold = selection.threshold();
        let predictions: Vec<u8> = probabilities
            .iter()
            .map(|&p| u8::from(p >= threshold))
            .collect();
        let confusion = ConfusionMatrix::from_predictions(&test.labels, &predictions);

        let report = MetricsReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            pr_auc,
            recall_at_p90: selection.achieved_recall(),
            threshold,
            threshold_status: selection.status(),
            min_precision: self.config.min_precision,
            confusion_matrix: confusion.to_rows(),
            classification_report: ClassificationReport::from_confusion(&confusion),
        };

        Ok((model, selection, report))
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::threshold::parse_threshold_artifact;
    use crate::types::ThresholdStatus;

    /// Two well separated clusters with a little overlap.
    fn synthetic() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..400 {
            let fraud = i % 10 == 0;
            let jitter = (i % 7) as f64 * 0.1;
            let x = if fraud { 3.0 + jitter } else { jitter };
            rows.push(vec![x, (i % 5) as f64]);
            labels.push(u8::from(fraud));
        }
        Dataset {
            feature_names: vec!["amount".to_string(), "noise".to_string()],
            rows,
            labels,
        }
    }

    fn config(dir: &Path) -> TrainingConfig {
        let mut config = AppConfig::default().training;
        config.output_dir = dir.join("artifacts").display().to_string();
        config.reports_dir = dir.join("reports").display().to_string();
        config.test_size = 0.25;
        config
    }

    #[test]
    fn test_pipeline_writes_consistent_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TrainingPipeline::new(config(dir.path()));
        let outcome = pipeline.run_on(&synthetic()).unwrap();

        assert_eq!(outcome.report.threshold_status, ThresholdStatus::Selected);
        assert_eq!(outcome.report.recall_at_p90, Some(1.0));
        assert!(outcome.report.pr_auc > 0.99);

        let threshold = parse_threshold_artifact(&fs::read(&outcome.threshold_path).unwrap())
            .unwrap();
        assert_eq!(threshold.value(), outcome.report.threshold);

        let model = LogisticModel::from_json(&fs::read(&outcome.model_path).unwrap()).unwrap();
        assert_eq!(model.feature_names, vec!["amount", "noise"]);

        let metrics: serde_json::Value =
            serde_json::from_slice(&fs::read(&outcome.metrics_path).unwrap()).unwrap();
        for key in [
            "pr_auc",
            "recall_at_p90",
            "threshold",
            "confusion_matrix",
            "classification_report",
        ] {
            assert!(metrics.get(key).is_some(), "missing {}", key);
        }
        // [[tn, fp], [fn, tp]] with no misses on separable data
        assert_eq!(metrics["confusion_matrix"][1][0], 0);
    }

    #[test]
    fn test_unsatisfiable_constraint_is_reported() {
        // Labels independent of the features: precision 1.0 is out of reach.
        let mut dataset = synthetic();
        for (i, label) in dataset.labels.iter_mut().enumerate() {
            *label = u8::from(i % 3 == 0);
        }
        for (i, row) in dataset.rows.iter_mut().enumerate() {
            row[0] = (i % 4) as f64;
            row[1] = (i % 4) as f64;
        }

        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.min_precision = 1.0;
        let outcome = TrainingPipeline::new(config).run_on(&dataset).unwrap();

        assert!(outcome.selection.is_fallback());
        assert_eq!(outcome.report.threshold_status, ThresholdStatus::Fallback);
        assert_eq!(outcome.report.recall_at_p90, None);
        assert_eq!(outcome.report.threshold, 0.5);

        let metrics: serde_json::Value =
            serde_json::from_slice(&fs::read(&outcome.metrics_path).unwrap()).unwrap();
        assert!(metrics["recall_at_p90"].is_null());
    }

    #[test]
    fn test_single_class_dataset_is_rejected() {
        let mut dataset = synthetic();
        dataset.labels.iter_mut().for_each(|y| *y = 0);
        let dir = tempfile::tempdir().unwrap();
        assert!(TrainingPipeline::new(config(dir.path()))
            .train_and_evaluate(&dataset)
            .is_err());
    }
}
