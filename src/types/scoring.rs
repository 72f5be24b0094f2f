//! Request and response bodies of the decision service

use serde::{Deserialize, Serialize};

/// Raw-feature scoring request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub features: Vec<f64>,
}

/// Probability-only decision request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecideRequest {
    pub probability: f64,
}

/// Binary decision returned for every accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Fraud probability the decision was made on
    pub probability: f64,
    /// 1 when `probability >= threshold`, otherwise 0
    pub is_fraud: u8,
    /// Threshold loaded at startup
    pub threshold: f64,
}

impl Decision {
    pub fn flagged(&self) -> bool {
        self.is_fraud == 1
    }
}

/// Health endpoint body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub bucket: String,
    pub prefix: String,
    pub threshold: f64,
    pub expected_features: usize,
}
