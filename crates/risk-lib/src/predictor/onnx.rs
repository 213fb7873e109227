//! ONNX classifier inference using tract
//!
//! Expects the output layout of a scikit-learn classifier exported with
//! `zipmap=False`: a label tensor and a `[1, n_classes]` probability tensor.

use super::{check_width, Classifier};
use crate::error::InferenceError;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Positions of the label and probability tensors in the model outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnnxOutputs {
    pub label: usize,
    pub probabilities: usize,
}

impl Default for OnnxOutputs {
    fn default() -> Self {
        Self {
            label: 0,
            probabilities: 1,
        }
    }
}

/// ONNX-based binary classifier
pub struct OnnxClassifier {
    model: TractModel,
    input_width: usize,
    outputs: OnnxOutputs,
    classes: Vec<i64>,
    version: String,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl OnnxClassifier {
    /// Parse and optimize an ONNX model for a single-row input of `input_width` features
    pub fn from_bytes(
        model_bytes: &[u8],
        input_width: usize,
        outputs: OnnxOutputs,
        classes: Vec<i64>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let model = Self::load_model(model_bytes, input_width)?;
        Ok(Self {
            model,
            input_width,
            outputs,
            classes,
            version: version.into(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    fn load_model(model_bytes: &[u8], input_width: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, input_width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn run(&self, features: &[f32]) -> Result<TVec<TValue>, InferenceError> {
        check_width(self.input_width, features)?;

        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.input_width), features.to_vec())
                .map_err(|e| InferenceError::Execution(e.to_string()))?
                .into();

        let start = Instant::now();
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Execution(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(outputs)
    }

    fn output<'a>(outputs: &'a TVec<TValue>, index: usize) -> Result<&'a TValue, InferenceError> {
        outputs.get(index).ok_or_else(|| {
            InferenceError::Execution(format!(
                "model produced {} outputs, output {} requested",
                outputs.len(),
                index
            ))
        })
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<i64, InferenceError> {
        let outputs = self.run(features)?;
        let labels = Self::output(&outputs, self.outputs.label)?
            .cast_to::<i64>()
            .map_err(|e| InferenceError::Execution(format!("label output: {:#}", e)))?;
        let labels = labels
            .as_slice::<i64>()
            .map_err(|e| InferenceError::Execution(format!("label output: {:#}", e)))?;
        labels
            .first()
            .copied()
            .ok_or_else(|| InferenceError::Execution("label output is empty".to_string()))
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError> {
        let outputs = self.run(features)?;
        let probabilities = Self::output(&outputs, self.outputs.probabilities)?
            .cast_to::<f32>()
            .map_err(|e| InferenceError::Execution(format!("probability output: {:#}", e)))?;
        let probabilities = probabilities
            .as_slice::<f32>()
            .map_err(|e| InferenceError::Execution(format!("probability output: {:#}", e)))?;
        Ok(probabilities.to_vec())
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}
