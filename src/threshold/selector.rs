//! Precision-constrained threshold selection
//!
//! Picks the probability cutoff with the highest recall among those whose
//! precision meets a minimum. When no cutoff qualifies the selection falls
//! back to [`DEFAULT_THRESHOLD`] and says so in its result type, so callers
//! have to handle the unsatisfiable case explicitly.

use crate::error::SelectionError;
use crate::threshold::curve::precision_recall_curve;
use crate::types::{ScoredExample, ThresholdStatus};
use serde::Serialize;
use tracing::debug;

/// Threshold written when the precision constraint cannot be met.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Why no qualifying threshold exists
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnsatisfiableReason {
    /// No examples were supplied
    Empty,
    /// Every example is labelled negative
    NoPositives,
    /// Every example is labelled positive
    NoNegatives,
    /// No cutoff reaches the required precision
    PrecisionNotReached { best_precision: f64 },
}

/// Result of threshold selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThresholdSelection {
    /// A cutoff meeting the precision constraint
    Selected {
        threshold: f64,
        precision: f64,
        recall: f64,
    },
    /// The constraint is unsatisfiable on this example set
    Unsatisfiable {
        fallback_threshold: f64,
        reason: UnsatisfiableReason,
    },
}

impl ThresholdSelection {
    fn fallback(reason: UnsatisfiableReason) -> Self {
        ThresholdSelection::Unsatisfiable {
            fallback_threshold: DEFAULT_THRESHOLD,
            reason,
        }
    }

    /// Threshold to persist, whichever branch was taken.
    pub fn threshold(&self) -> f64 {
        match *self {
            ThresholdSelection::Selected { threshold, .. } => threshold,
            ThresholdSelection::Unsatisfiable {
                fallback_threshold, ..
            } => fallback_threshold,
        }
    }

    /// Recall at the selected threshold, `None` on fallback.
    pub fn achieved_recall(&self) -> Option<f64> {
        match *self {
            ThresholdSelection::Selected { recall, .. } => Some(recall),
            ThresholdSelection::Unsatisfiable { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ThresholdSelection::Unsatisfiable { .. })
    }

    pub fn status(&self) -> ThresholdStatus {
        if self.is_fallback() {
            ThresholdStatus::Fallback
        } else {
            ThresholdStatus::Selected
        }
    }
}

/// Select the cutoff maximizing recall subject to `precision >= min_precision`.
///
/// Candidates are the distinct probabilities in `examples`, visited in
/// ascending order; on equal recall the first (lowest) candidate wins.
/// Inputs with no examples or a single label class always fall back.
pub fn select_threshold(
    examples: &[ScoredExample],
    min_precision: f64,
) -> Result<ThresholdSelection, SelectionError> {
    if !min_precision.is_finite() || !(0.0..=1.0).contains(&min_precision) {
        return Err(SelectionError::InvalidMinPrecision(min_precision));
    }
    if let Some(bad) = examples
        .iter()
        .find(|e| !e.probability.is_finite() || !(0.0..=1.0).contains(&e.probability))
    {
        return Err(SelectionError::InvalidProbability(bad.probability));
    }
    if let Some(bad) = examples.iter().find(|e| e.label > 1) {
        return Err(SelectionError::InvalidLabel(bad.label));
    }

    if examples.is_empty() {
        return Ok(ThresholdSelection::fallback(UnsatisfiableReason::Empty));
    }
    let positives = examples.iter().filter(|e| e.is_positive()).count();
    if positives == 0 {
        return Ok(ThresholdSelection::fallback(UnsatisfiableReason::NoPositives));
    }
    if positives == examples.len() {
        return Ok(ThresholdSelection::fallback(UnsatisfiableReason::NoNegatives));
    }

    let curve = precision_recall_curve(examples);

    let mut best: Option<ThresholdSelection> = None;
    let mut best_recall = f64::NEG_INFINITY;
    let mut best_precision = 0.0f64;

    for point in &curve {
        best_precision = best_precision.max(point.precision);
        // Strict comparison keeps the earliest candidate on ties.
        if point.precision >= min_precision && point.recall > best_recall {
            best_recall = point.recall;
            best = Some(ThresholdSelection::Selected {
                threshold: point.threshold,
                precision: point.precision,
                recall: point.recall,
            });
        }
    }

    let selection = best.unwrap_or_else(|| {
        ThresholdSelection::fallback(UnsatisfiableReason::PrecisionNotReached { best_precision })
    });

    debug!(
        candidates = curve.len(),
        min_precision = min_precision,
        threshold = selection.threshold(),
        fallback = selection.is_fallback(),
        "Threshold selection complete"
    );

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn examples(probs: &[f64], labels: &[u8]) -> Vec<ScoredExample> {
        ScoredExample::from_pairs(probs, labels).unwrap()
    }

    fn precision_at(examples: &[ScoredExample], threshold: f64) -> f64 {
        let flagged: Vec<_> = examples
            .iter()
            .filter(|e| e.probability >= threshold)
            .collect();
        if flagged.is_empty() {
            return 1.0;
        }
        flagged.iter().filter(|e| e.is_positive()).count() as f64 / flagged.len() as f64
    }

    #[test]
    fn test_separable_set_picks_lowest_perfect_cutoff() {
        let set = examples(&[0.1, 0.4, 0.6, 0.9], &[0, 0, 1, 1]);
        let selection = select_threshold(&set, 0.9).unwrap();

        assert_eq!(
            selection,
            ThresholdSelection::Selected {
                threshold: 0.6,
                precision: 1.0,
                recall: 1.0
            }
        );
        assert_eq!(selection.achieved_recall(), Some(1.0));
        assert_eq!(selection.status(), ThresholdStatus::Selected);
    }

    #[test]
    fn test_trades_recall_for_precision() {
        // Only 0.55 (p=0.6, r=0.75) and 0.7 (p=2/3, r=0.5) reach 0.6.
        let set = examples(
            &[0.1, 0.3, 0.5, 0.55, 0.6, 0.7, 0.8, 0.9],
            &[0, 1, 0, 1, 0, 1, 1, 0],
        );
        let selection = select_threshold(&set, 0.6).unwrap();
        let threshold = selection.threshold();
        assert!(precision_at(&set, threshold) >= 0.6);
        assert_eq!(threshold, 0.55);
        assert_eq!(selection.achieved_recall(), Some(0.75));

        let strict = select_threshold(&set, 0.99).unwrap();
        assert!(strict.is_fallback());
    }

    #[test]
    fn test_equal_recall_prefers_lowest_threshold() {
        // 0.7 and 0.8 both clear the floor with recall 1.
        let set = examples(&[0.2, 0.7, 0.8, 0.9], &[0, 0, 1, 1]);
        let at_07 = select_threshold(&set, 0.6).unwrap();
        assert_eq!(at_07.threshold(), 0.7);

        let set = examples(&[0.2, 0.8, 0.9], &[0, 1, 1]);
        let selection = select_threshold(&set, 1.0).unwrap();
        assert_eq!(selection.threshold(), 0.8);
    }

    #[test]
    fn test_unreachable_precision_falls_back() {
        let set = examples(&[0.1, 0.2, 0.3, 0.9], &[1, 0, 1, 0]);
        let selection = select_threshold(&set, 0.9).unwrap();

        assert!(selection.is_fallback());
        assert_eq!(selection.threshold(), DEFAULT_THRESHOLD);
        assert_eq!(selection.achieved_recall(), None);
        match selection {
            ThresholdSelection::Unsatisfiable {
                reason: UnsatisfiableReason::PrecisionNotReached { best_precision },
                ..
            } => assert_eq!(best_precision, 0.5),
            other => panic!("unexpected selection {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_inputs_fall_back() {
        let negatives = examples(&[0.1, 0.5, 0.9], &[0, 0, 0]);
        assert_eq!(
            select_threshold(&negatives, 0.0).unwrap(),
            ThresholdSelection::Unsatisfiable {
                fallback_threshold: DEFAULT_THRESHOLD,
                reason: UnsatisfiableReason::NoPositives
            }
        );

        let positives = examples(&[0.1, 0.5, 0.9], &[1, 1, 1]);
        assert!(select_threshold(&positives, 0.9).unwrap().is_fallback());

        assert_eq!(
            select_threshold(&[], 0.5).unwrap(),
            ThresholdSelection::Unsatisfiable {
                fallback_threshold: DEFAULT_THRESHOLD,
                reason: UnsatisfiableReason::Empty
            }
        );
    }

    #[test]
    fn test_invalid_min_precision() {
        let set = examples(&[0.1, 0.9], &[0, 1]);
        assert_eq!(
            select_threshold(&set, 1.5),
            Err(SelectionError::InvalidMinPrecision(1.5))
        );
        assert!(select_threshold(&set, f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_hand_built_invalid_example() {
        let set = vec![
            ScoredExample {
                probability: 1.7,
                label: 1,
            },
            ScoredExample {
                probability: 0.2,
                label: 0,
            },
        ];
        assert_eq!(
            select_threshold(&set, 0.5),
            Err(SelectionError::InvalidProbability(1.7))
        );
    }

    fn scored_set() -> impl Strategy<Value = Vec<ScoredExample>> {
        prop::collection::vec((0u32..=20, 0u8..=1), 1..60).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(bucket, label)| ScoredExample {
                    probability: bucket as f64 / 20.0,
                    label,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn selected_threshold_meets_precision(set in scored_set(), min_precision in 0.0f64..=1.0) {
            let selection = select_threshold(&set, min_precision).unwrap();
            if let ThresholdSelection::Selected { threshold, precision, .. } = selection {
                prop_assert!(precision >= min_precision);
                prop_assert!(precision_at(&set, threshold) >= min_precision);
            }
        }

        #[test]
        fn recall_never_rises_with_stricter_precision(
            set in scored_set(),
            a in 0.0f64..=1.0,
            b in 0.0f64..=1.0,
        ) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let loose = select_threshold(&set, low).unwrap().achieved_recall();
            let strict = select_threshold(&set, high).unwrap().achieved_recall();
            if let Some(strict_recall) = strict {
                let loose_recall = loose.expect("looser constraint must be satisfiable");
                prop_assert!(strict_recall <= loose_recall);
            }
        }

        #[test]
        fn single_label_always_falls_back(
            probs in prop::collection::vec(0.0f64..=1.0, 1..40),
            label in 0u8..=1,
            min_precision in 0.0f64..=1.0,
        ) {
            let set: Vec<ScoredExample> = probs
                .into_iter()
                .map(|probability| ScoredExample { probability, label })
                .collect();
            prop_assert!(select_threshold(&set, min_precision).unwrap().is_fallback());
        }
    }
}
