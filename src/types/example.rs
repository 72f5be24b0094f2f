//! Scored examples fed to the threshold selector

use crate::error::SelectionError;
use serde::{Deserialize, Serialize};

/// A classifier probability paired with the true label of the example.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredExample {
    /// Predicted fraud probability (0.0 - 1.0)
    pub probability: f64,
    /// True label (1 = fraud)
    pub label: u8,
}

impl ScoredExample {
    /// Create a scored example, rejecting out-of-domain values.
    pub fn new(probability: f64, label: u8) -> Result<Self, SelectionError> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(SelectionError::InvalidProbability(probability));
        }
        if label > 1 {
            return Err(SelectionError::InvalidLabel(label));
        }
        Ok(Self { probability, label })
    }

    /// Zip parallel probability and label slices into scored examples.
    pub fn from_pairs(probabilities: &[f64], labels: &[u8]) -> Result<Vec<Self>, SelectionError> {
        if probabilities.len() != labels.len() {
            return Err(SelectionError::LengthMismatch {
                probabilities: probabilities.len(),
                labels: labels.len(),
            });
        }

        probabilities
            .iter()
            .zip(labels)
            .map(|(&p, &y)| Self::new(p, y))
            .collect()
    }

    pub fn is_positive(&self) -> bool {
        self.label == 1
    }
}
