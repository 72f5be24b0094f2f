//! ONNX Runtime model loaded from artifact bytes

use crate::error::ArtifactError;
use crate::models::ProbabilityModel;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier exported to ONNX (tree ensembles, linear models, ...).
pub struct OnnxModel {
    name: String,
    /// `run` needs `&mut Session`
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxModel {
    /// Build a session from the serialized model.
    pub fn from_bytes(name: &str, bytes: &[u8], threads: usize) -> Result<Self, ArtifactError> {
        let malformed = |e: ort::Error| ArtifactError::MalformedModelArtifact(e.to_string());

        ort::init().commit().map_err(malformed)?;

        let session = Session::builder()
            .map_err(malformed)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(malformed)?
            .with_intra_threads(threads)
            .map_err(malformed)?
            .commit_from_memory(bytes)
            .map_err(malformed)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            threads = threads,
            "ONNX model loaded"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    fn extract_probability(&self, outputs: &SessionOutputs) -> Result<f64> {
        if let Some(output) = outputs.get(self.output_name.as_str()) {
            if let Some(prob) = self.probability_from_value(&output) {
                return Ok(prob);
            }
        }

        // Fall back to any non-label output
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(prob) = self.probability_from_value(&output) {
                debug!(model = %self.name, output = %name, "Probability from fallback output");
                return Ok(prob);
            }
        }

        anyhow::bail!("model {} produced no probability output", self.name)
    }

    fn probability_from_value(&self, output: &DynValue) -> Option<f64> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let classes = dims.last().copied().unwrap_or(1);
            return match (classes, data) {
                // [batch, classes]: fraud is class 1
                (c, data) if c >= 2 && data.len() >= 2 => Some(data[1] as f64),
                (_, [p, ..]) => Some(*p as f64),
                _ => None,
            };
        }

        // seq(map(int64, float)) as exported by some tree libraries
        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return self.probability_from_sequence_map(output).ok();
        }

        None
    }

    fn probability_from_sequence_map(&self, output: &DynValue) -> Result<f64> {
        let allocator = Allocator::default();
        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;
        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let first = maps.first().context("Empty sequence output")?;
        let pairs = first.try_extract_key_values::<i64, f32>()?;

        if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 1) {
            return Ok(*p as f64);
        }
        if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 0) {
            return Ok(1.0 - *p as f64);
        }
        anyhow::bail!("No class probability in map output")
    }
}

impl ProbabilityModel for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_count(&self) -> Option<usize> {
        // Input width is not read from the graph.
        None
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        let input: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let shape = vec![1_i64, input.len() as i64];
        let tensor = Tensor::from_array((shape, input)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => tensor])?;

        let prob = self.extract_probability(&outputs)?;
        Ok(prob.clamp(0.0, 1.0))
    }
}
