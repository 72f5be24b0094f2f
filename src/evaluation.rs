//! Held-out evaluation metrics recorded in the training report.

use crate::threshold::curve::precision_recall_curve;
use crate::types::ScoredExample;
use serde::{Deserialize, Serialize};

/// Average precision (area under the step-wise precision-recall curve).
///
/// `AP = Σ (R_n - R_{n-1}) · P_n`, summed from the highest threshold down.
/// Returns 0 when there are no positives.
pub fn average_precision(examples: &[ScoredExample]) -> f64 {
    if !examples.iter().any(|e| e.is_positive()) {
        return 0.0;
    }

    let curve = precision_recall_curve(examples);
    let mut previous_recall = 0.0;
    let mut ap = 0.0;
    for point in curve.iter().rev() {
        ap += (point.recall - previous_recall) * point.precision;
        previous_recall = point.recall;
    }
    ap
}

/// Binary confusion matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_positives: u64,
}

impl ConfusionMatrix {
    /// Tally predictions against labels. Both slices must have equal length;
    /// extra elements of the longer one are ignored.
    pub fn from_predictions(labels: &[u8], predictions: &[u8]) -> Self {
        let mut matrix = Self::default();
        for (&y, &p) in labels.iter().zip(predictions) {
            match (y, p) {
                (0, 0) => matrix.true_negatives += 1,
                (0, _) => matrix.false_positives += 1,
                (_, 0) => matrix.false_negatives += 1,
                _ => matrix.true_positives += 1,
            }
        }
        matrix
    }

    /// Row-major `[[tn, fp], [fn, tp]]`.
    pub fn to_rows(&self) -> [[u64; 2]; 2] {
        [
            [self.true_negatives, self.false_positives],
            [self.false_negatives, self.true_positives],
        ]
    }

    pub fn total(&self) -> u64 {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }
}

/// Precision, recall, F1 and support for one class or an average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: u64,
}

impl ClassMetrics {
    fn new(tp: u64, fp: u64, fn_: u64) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1_score,
            support: tp + fn_,
        }
    }
}

/// Per-class report keyed the way common ML tooling keys it (`"0"`, `"1"`,
/// `"accuracy"`, `"macro avg"`, `"weighted avg"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    #[serde(rename = "0")]
    pub legitimate: ClassMetrics,
    #[serde(rename = "1")]
    pub fraud: ClassMetrics,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassMetrics,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(matrix: &ConfusionMatrix) -> Self {
        let legitimate = ClassMetrics::new(
            matrix.true_negatives,
            matrix.false_negatives,
            matrix.false_positives,
        );
        let fraud = ClassMetrics::new(
            matrix.true_positives,
            matrix.false_positives,
            matrix.false_negatives,
        );
        let total = matrix.total();

        let macro_avg = ClassMetrics {
            precision: (legitimate.precision + fraud.precision) / 2.0,
            recall: (legitimate.recall + fraud.recall) / 2.0,
            f1_score: (legitimate.f1_score + fraud.f1_score) / 2.0,
            support: total,
        };

        let weight = |a: f64, b: f64| {
            if total == 0 {
                0.0
            } else {
                (a * legitimate.support as f64 + b * fraud.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weight(legitimate.precision, fraud.precision),
            recall: weight(legitimate.recall, fraud.recall),
            f1_score: weight(legitimate.f1_score, fraud.f1_score),
            support: total,
        };

        Self {
            legitimate,
            fraud,
            accuracy: ratio(matrix.true_negatives + matrix.true_positives, total),
            macro_avg,
            weighted_avg,
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_precision_perfect_ranking() {
        let set = ScoredExample::from_pairs(&[0.1, 0.4, 0.6, 0.9], &[0, 0, 1, 1]).unwrap();
        assert!((average_precision(&set) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_precision_mixed_ranking() {
        // Descending: 0.9(1) 0.8(0) 0.7(1) 0.1(0)
        // AP = 0.5 * 1.0 + 0.5 * (2/3)
        let set = ScoredExample::from_pairs(&[0.9, 0.8, 0.7, 0.1], &[1, 0, 1, 0]).unwrap();
        let expected = 0.5 + 0.5 * (2.0 / 3.0);
        assert!((average_precision(&set) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_average_precision_without_positives() {
        let set = ScoredExample::from_pairs(&[0.2, 0.3], &[0, 0]).unwrap();
        assert_eq!(average_precision(&set), 0.0);
    }

    #[test]
    fn test_confusion_matrix_rows() {
        let matrix = ConfusionMatrix::from_predictions(&[0, 0, 1, 1, 1], &[0, 1, 1, 0, 1]);
        assert_eq!(matrix.to_rows(), [[1, 1], [1, 2]]);
        assert_eq!(matrix.total(), 5);
    }

    #[test]
    fn test_classification_report() {
        let matrix = ConfusionMatrix {
            true_negatives: 90,
            false_positives: 10,
            false_negatives: 5,
            true_positives: 15,
        };
        let report = ClassificationReport::from_confusion(&matrix);

        assert!((report.fraud.precision - 0.6).abs() < 1e-12);
        assert!((report.fraud.recall - 0.75).abs() < 1e-12);
        assert_eq!(report.fraud.support, 20);
        assert_eq!(report.legitimate.support, 100);
        assert!((report.accuracy - 105.0 / 120.0).abs() < 1e-12);
        assert_eq!(report.macro_avg.support, 120);

        let json = serde_json::to_value(report).unwrap();
        assert!(json.get("macro avg").is_some());
        assert!(json["1"].get("f1-score").is_some());
    }
}
