//! Training artifacts handed from the offline pipeline to the service

use crate::evaluation::ClassificationReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Threshold artifact as written by training: `{"t": <float>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdArtifact {
    pub t: f64,
}

/// Outcome of threshold selection as recorded in the metrics report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStatus {
    /// A threshold meeting the precision constraint was found
    Selected,
    /// No threshold met the constraint; the default was written instead
    Fallback,
}

/// Metrics report written next to the model and threshold artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Unique identifier of the training run
    pub run_id: String,

    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,

    /// Average precision over the held-out set
    pub pr_auc: f64,

    /// Recall achieved at the chosen threshold; `null` when the precision
    /// constraint could not be met
    pub recall_at_p90: Option<f64>,

    /// Threshold written to the threshold artifact
    pub threshold: f64,

    /// Whether the threshold was selected or fell back to the default
    pub threshold_status: ThresholdStatus,

    /// Precision constraint used for selection
    pub min_precision: f64,

    /// `[[tn, fp], [fn, tp]]` on the held-out set at `threshold`
    pub confusion_matrix: [[u64; 2]; 2],

    /// Per-class precision/recall/f1 at `threshold`
    pub classification_report: ClassificationReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_artifact_shape() {
        let json = serde_json::to_string(&ThresholdArtifact { t: 0.61 }).unwrap();
        assert_eq!(json, r#"{"t":0.61}"#);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ThresholdStatus::Fallback).unwrap(),
            r#""fallback""#
        );
    }
}
