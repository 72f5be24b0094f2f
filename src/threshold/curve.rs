//! Empirical precision-recall curve over a scored example set

use crate::types::ScoredExample;
use serde::Serialize;

/// One candidate cutoff of the precision-recall curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrecisionRecallPoint {
    /// Fraction of examples at or above `threshold` that are positive
    pub precision: f64,
    /// Fraction of all positives at or above `threshold`
    pub recall: f64,
    /// Candidate cutoff (a probability present in the example set)
    pub threshold: f64,
}

/// Compute the precision-recall curve, one point per distinct probability,
/// ordered by threshold ascending.
///
/// Only examples with `probability >= threshold` count as predicted
/// positive. When the set contains no positives, recall is reported as 0.
/// The conventional terminal point (precision 1, recall 0, no threshold) is
/// not part of the returned curve.
pub fn precision_recall_curve(examples: &[ScoredExample]) -> Vec<PrecisionRecallPoint> {
    if examples.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&ScoredExample> = examples.iter().collect();
    sorted.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let total_positives = examples.iter().filter(|e| e.is_positive()).count();

    // Sweep from the highest score down, emitting a point at the end of each
    // run of equal probabilities so ties are counted together.
    let mut points = Vec::new();
    let mut tp = 0usize;
    let mut fp = 0usize;

    for (i, example) in sorted.iter().enumerate() {
        if example.is_positive() {
            tp += 1;
        } else {
            fp += 1;
        }

        let run_ends = sorted
            .get(i + 1)
            .map_or(true, |next| next.probability != example.probability);

        if run_ends {
            let recall = if total_positives > 0 {
                tp as f64 / total_positives as f64
            } else {
                0.0
            };
            points.push(PrecisionRecallPoint {
                precision: tp as f64 / (tp + fp) as f64,
                recall,
                threshold: example.probability,
            });
        }
    }

    points.reverse();
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn examples(probs: &[f64], labels: &[u8]) -> Vec<ScoredExample> {
        ScoredExample::from_pairs(probs, labels).unwrap()
    }

    #[test]
    fn test_curve_points_ascending() {
        let curve = precision_recall_curve(&examples(&[0.1, 0.4, 0.6, 0.9], &[0, 0, 1, 1]));

        let thresholds: Vec<f64> = curve.iter().map(|p| p.threshold).collect();
        assert_eq!(thresholds, vec![0.1, 0.4, 0.6, 0.9]);

        assert_eq!(curve[0].precision, 0.5);
        assert_eq!(curve[0].recall, 1.0);
        assert!((curve[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(curve[2].precision, 1.0);
        assert_eq!(curve[2].recall, 1.0);
        assert_eq!(curve[3].recall, 0.5);
    }

    #[test]
    fn test_tied_probabilities_share_a_point() {
        let curve = precision_recall_curve(&examples(&[0.5, 0.5, 0.5, 0.8], &[0, 1, 1, 0]));

        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].threshold, 0.5);
        assert_eq!(curve[0].precision, 0.5);
        assert_eq!(curve[0].recall, 1.0);
        assert_eq!(curve[1].threshold, 0.8);
        assert_eq!(curve[1].precision, 0.0);
        assert_eq!(curve[1].recall, 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(precision_recall_curve(&[]).is_empty());
    }

    #[test]
    fn test_recall_is_non_increasing() {
        let curve = precision_recall_curve(&examples(
            &[0.05, 0.2, 0.2, 0.35, 0.7, 0.71, 0.9, 0.95],
            &[0, 1, 0, 0, 1, 0, 1, 1],
        ));
        for pair in curve.windows(2) {
            assert!(pair[0].recall >= pair[1].recall);
            assert!(pair[0].threshold < pair[1].threshold);
        }
    }
}
