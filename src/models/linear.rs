//! Logistic regression over standardized features
//!
//! The default model format. Small enough to train in-process and to ship as
//! a JSON artifact next to the threshold.

use crate::error::ArtifactError;
use crate::models::ProbabilityModel;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Gradient descent settings for [`LogisticModel::fit`].
#[derive(Debug, Clone)]
pub struct FitParams {
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty on the weights
    pub l2: f64,
    /// Weight of positive examples; `None` uses `negatives / positives`
    pub positive_weight: Option<f64>,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 0.1,
            l2: 1e-4,
            positive_weight: None,
        }
    }
}

/// Binary logistic regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
    /// Per-feature mean used for standardization
    pub means: Vec<f64>,
    /// Per-feature standard deviation used for standardization
    pub scales: Vec<f64>,
    #[serde(default)]
    pub feature_names: Vec<String>,
}

impl LogisticModel {
    /// Decode and validate a JSON model artifact.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let model: Self = serde_json::from_slice(bytes)
            .map_err(|e| ArtifactError::MalformedModelArtifact(e.to_string()))?;

        let n = model.weights.len();
        if n == 0 || model.means.len() != n || model.scales.len() != n {
            return Err(ArtifactError::MalformedModelArtifact(format!(
                "inconsistent dimensions: {} weights, {} means, {} scales",
                n,
                model.means.len(),
                model.scales.len()
            )));
        }
        if !model.feature_names.is_empty() && model.feature_names.len() != n {
            return Err(ArtifactError::MalformedModelArtifact(format!(
                "{} feature names for {} weights",
                model.feature_names.len(),
                n
            )));
        }
        let all_finite = model
            .weights
            .iter()
            .chain(&model.means)
            .chain(&model.scales)
            .chain(std::iter::once(&model.bias))
            .all(|v| v.is_finite());
        if !all_finite || model.scales.iter().any(|&s| s <= 0.0) {
            return Err(ArtifactError::MalformedModelArtifact(
                "non-finite parameter or non-positive scale".to_string(),
            ));
        }

        Ok(model)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Fit by batch gradient descent on the weighted log loss.
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], params: &FitParams) -> Result<Self> {
        if rows.is_empty() {
            bail!("cannot fit a model on an empty training set");
        }
        if rows.len() != labels.len() {
            bail!("{} rows but {} labels", rows.len(), labels.len());
        }
        let n_features = rows[0].len();
        if n_features == 0 || rows.iter().any(|r| r.len() != n_features) {
            bail!("rows must share a non-zero feature count");
        }

        let (means, scales) = standardization(rows, n_features);
        let standardized: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| standardize(row, &means, &scales))
            .collect();

        let positives = labels.iter().filter(|&&y| y == 1).count();
        let negatives = labels.len() - positives;
        let positive_weight = params.positive_weight.unwrap_or_else(|| {
            if positives > 0 {
                negatives as f64 / positives as f64
            } else {
                1.0
            }
        });
        let sample_weight = |y: u8| if y == 1 { positive_weight } else { 1.0 };
        let total_weight: f64 = labels.iter().map(|&y| sample_weight(y)).sum();

        info!(
            rows = rows.len(),
            features = n_features,
            positives = positives,
            positive_weight = positive_weight,
            epochs = params.epochs,
            "Fitting logistic model"
        );

        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;

        for epoch in 0..params.epochs {
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;
            let mut loss = 0.0;

            for (x, &y) in standardized.iter().zip(labels) {
                let p = sigmoid(dot(&weights, x) + bias);
                let w = sample_weight(y);
                let err = (p - y as f64) * w;
                for (g, xi) in grad_w.iter_mut().zip(x) {
                    *g += err * xi;
                }
                grad_b += err;
                loss -= w * if y == 1 {
                    p.max(1e-15).ln()
                } else {
                    (1.0 - p).max(1e-15).ln()
                };
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= params.learning_rate * (g / total_weight + params.l2 * *w);
            }
            bias -= params.learning_rate * grad_b / total_weight;

            if epoch % 50 == 0 || epoch + 1 == params.epochs {
                debug!(epoch = epoch, loss = loss / total_weight, "Training progress");
            }
        }

        Ok(Self {
            weights,
            bias,
            means,
            scales,
            feature_names: Vec::new(),
        })
    }

    /// Attach column names for the report and artifact.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    /// Probability of the positive class for one row.
    pub fn probability(&self, features: &[f64]) -> f64 {
        let x = standardize(features, &self.means, &self.scales);
        sigmoid(dot(&self.weights, &x) + self.bias)
    }
}

impl ProbabilityModel for LogisticModel {
    fn name(&self) -> &str {
        "logistic"
    }

    fn feature_count(&self) -> Option<usize> {
        Some(self.weights.len())
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.weights.len() {
            bail!(
                "model expects {} features, got {}",
                self.weights.len(),
                features.len()
            );
        }
        Ok(self.probability(features))
    }
}

fn standardization(rows: &[Vec<f64>], n_features: usize) -> (Vec<f64>, Vec<f64>) {
    let n = rows.len() as f64;
    let mut means = vec![0.0; n_features];
    for row in rows {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }

    let mut scales = vec![0.0; n_features];
    for row in rows {
        for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (v - m).powi(2) / n;
        }
    }
    for s in scales.iter_mut() {
        *s = s.sqrt();
        // Constant columns
        if *s < 1e-12 {
            *s = 1.0;
        }
    }

    (means, scales)
}

fn standardize(row: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means)
        .zip(scales)
        .map(|((v, m), s)| (v - m) / s)
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = i as f64 / 10.0;
            rows.push(vec![x, 1.0]);
            labels.push(u8::from(x > 2.0));
        }
        (rows, labels)
    }

    #[test]
    fn test_fit_learns_separable_direction() {
        let (rows, labels) = separable();
        let model = LogisticModel::fit(&rows, &labels, &FitParams::default()).unwrap();

        assert!(model.weights[0] > 0.0);
        assert!(model.probability(&[3.9, 1.0]) > 0.8);
        assert!(model.probability(&[0.1, 1.0]) < 0.2);
        // Constant column gets unit scale
        assert_eq!(model.scales[1], 1.0);
    }

    #[test]
    fn test_json_round_trip_and_validation() {
        let (rows, labels) = separable();
        let model = LogisticModel::fit(&rows, &labels, &FitParams::default())
            .unwrap()
            .with_feature_names(vec!["amount".to_string(), "bias".to_string()]);

        let decoded = LogisticModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(decoded, model);

        let broken = br#"{"weights": [1.0, 2.0], "bias": 0.0, "means": [0.0], "scales": [1.0, 1.0]}"#;
        assert!(matches!(
            LogisticModel::from_json(broken),
            Err(ArtifactError::MalformedModelArtifact(_))
        ));
    }

    #[test]
    fn test_predict_checks_width() {
        let model = LogisticModel {
            weights: vec![0.0; 3],
            bias: 0.0,
            means: vec![0.0; 3],
            scales: vec![1.0; 3],
            feature_names: Vec::new(),
        };
        assert!(model.predict_proba(&[1.0, 2.0]).is_err());
        assert_eq!(model.predict_proba(&[1.0, 2.0, 3.0]).unwrap(), 0.5);
    }

    #[test]
    fn test_fit_rejects_ragged_rows() {
        let rows = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(LogisticModel::fit(&rows, &[0, 1], &FitParams::default()).is_err());
    }
}
