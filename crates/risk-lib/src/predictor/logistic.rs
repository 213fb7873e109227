//! Logistic-regression classifier read from a JSON artifact
//!
//! A lightweight alternative to ONNX for linear models. The artifact holds
//! the fitted coefficients and, optionally, the standard scaler applied
//! before the linear score.

use super::{check_width, Classifier};
use crate::error::InferenceError;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

fn default_threshold() -> f32 {
    0.5
}

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

fn default_version() -> String {
    "logistic".to_string()
}

/// Per-feature standardization fitted at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

/// Serialized logistic-regression model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f32>,
    pub intercept: f32,
    /// Decision threshold on the probability of `classes[1]`
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    #[serde(default = "default_version")]
    pub version: String,
}

/// Binary logistic classifier
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    model: LogisticModel,
}

impl LogisticClassifier {
    pub fn new(model: LogisticModel) -> Result<Self> {
        if model.coefficients.is_empty() {
            bail!("model has no coefficients");
        }
        if model.classes.len() != 2 {
            bail!("expected 2 classes, found {}", model.classes.len());
        }
        if !(model.threshold > 0.0 && model.threshold <= 1.0) {
            bail!("threshold {} outside (0, 1]", model.threshold);
        }
        if let Some(scaler) = &model.scaler {
            let width = model.coefficients.len();
            if scaler.mean.len() != width || scaler.scale.len() != width {
                bail!(
                    "scaler has {} means and {} scales for {} coefficients",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    width
                );
            }
            if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                bail!("scaler contains a zero or non-finite scale");
            }
        }
        Ok(Self { model })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let model: LogisticModel =
            serde_json::from_slice(bytes).context("Failed to parse logistic model JSON")?;
        Self::new(model)
    }

    /// Probability of `classes[1]`
    fn positive_probability(&self, features: &[f32]) -> Result<f32, InferenceError> {
        check_width(self.model.coefficients.len(), features)?;

        let z: f32 = match &self.model.scaler {
            Some(scaler) => features
                .iter()
                .zip(&scaler.mean)
                .zip(&scaler.scale)
                .zip(&self.model.coefficients)
                .map(|(((x, mean), scale), w)| (x - mean) / scale * w)
                .sum(),
            None => features
                .iter()
                .zip(&self.model.coefficients)
                .map(|(x, w)| x * w)
                .sum(),
        };
        let p = sigmoid(z + self.model.intercept);
        if !p.is_finite() {
            return Err(InferenceError::InvalidProbability(p));
        }
        Ok(p)
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticClassifier {
    fn predict(&self, features: &[f32]) -> Result<i64, InferenceError> {
        let p = self.positive_probability(features)?;
        let idx = usize::from(p >= self.model.threshold);
        Ok(self.model.classes[idx])
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError> {
        let p = self.positive_probability(features)?;
        Ok(vec![1.0 - p, p])
    }

    fn classes(&self) -> &[i64] {
        &self.model.classes
    }

    fn input_width(&self) -> usize {
        self.model.coefficients.len()
    }

    fn version(&self) -> &str {
        &self.model.version
    }
}
