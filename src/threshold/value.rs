//! The persisted decision threshold and its artifact decoding

use crate::error::ArtifactError;
use serde::Serialize;
use serde_json::Value;

/// Probability cutoff the service decides with. Always finite and in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, ArtifactError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ArtifactError::MalformedThresholdArtifact(format!(
                "threshold must be a finite value in [0, 1], got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// 1 when `probability >= threshold`, otherwise 0.
    pub fn decide(&self, probability: f64) -> u8 {
        u8::from(probability >= self.0)
    }
}

/// Decode a threshold artifact.
///
/// Accepted shapes: a bare number, `{"threshold": x}` or `{"t": x}`.
/// `"threshold"` wins when both keys are present. Numeric strings are
/// accepted wherever a number is.
pub fn parse_threshold_artifact(bytes: &[u8]) -> Result<Threshold, ArtifactError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        ArtifactError::MalformedThresholdArtifact(format!("artifact is not UTF-8: {}", e))
    })?;

    let data: Value = serde_json::from_str(text.trim()).map_err(|e| {
        ArtifactError::MalformedThresholdArtifact(format!("artifact is not JSON: {}", e))
    })?;

    let raw = match &data {
        Value::Object(map) => map.get("threshold").or_else(|| map.get("t")).ok_or_else(|| {
            ArtifactError::MalformedThresholdArtifact(format!(
                "object has neither \"threshold\" nor \"t\" key; got {}",
                data
            ))
        })?,
        other => other,
    };

    Threshold::new(numeric(raw)?)
}

fn numeric(value: &Value) -> Result<f64, ArtifactError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            ArtifactError::MalformedThresholdArtifact(format!("unrepresentable number {}", n))
        }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            ArtifactError::MalformedThresholdArtifact(format!("non-numeric value {:?}", s))
        }),
        other => Err(ArtifactError::MalformedThresholdArtifact(format!(
            "non-numeric value {}",
            other
        ))),
    }
}
