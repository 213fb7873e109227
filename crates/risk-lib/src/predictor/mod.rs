//! Classifier contract, model loading and the inference adapter

mod adapter;
mod cache;
mod loader;
mod logistic;
mod onnx;
mod output;

pub use adapter::{predict, InferenceAdapter, POSITIVE_CLASS};
pub use cache::ClassifierCache;
pub use loader::{compute_checksum, load_classifier, ModelFormat, ModelSettings};
pub use logistic::{LogisticClassifier, LogisticModel, StandardScaler};
pub use onnx::{InferenceStats, OnnxClassifier, OnnxOutputs};
pub use output::{
    to_percentage, verdict_message, GaugeParams, RiskReport, GAUGE_LABEL, HIGH_RISK_PERCENT,
};

use crate::error::InferenceError;

/// Read-only capability exposed by a pre-trained binary classifier
///
/// Implementations are loaded once and never mutated, so one instance can
/// serve concurrent requests without locking.
pub trait Classifier: Send + Sync {
    /// Discrete class label for a single row
    fn predict(&self, features: &[f32]) -> Result<i64, InferenceError>;

    /// Per-class probabilities for a single row, ordered as [`Classifier::classes`]
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError>;

    /// Class labels in the order `predict_proba` reports them
    fn classes(&self) -> &[i64];

    /// Number of features the classifier was trained on
    fn input_width(&self) -> usize;

    /// Version string of the loaded artifact
    fn version(&self) -> &str;
}

/// Reject a row whose width does not match the trained dimensionality
pub(crate) fn check_width(expected: usize, features: &[f32]) -> Result<(), InferenceError> {
    if features.len() != expected {
        return Err(InferenceError::DimensionMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}
