//! Error taxonomy for schema loading, record validation and inference

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T, E = PredictError> = std::result::Result<T, E>;

/// Top-level failure of a prediction request
///
/// None of these are retried; callers surface them to the user as-is.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The patient record does not conform to the feature schema
    #[error("schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaError),

    /// The classifier artifact could not be loaded or deserialized
    #[error("model unavailable at {path:?}: {reason}")]
    ModelUnavailable { path: PathBuf, reason: String },

    /// The classifier raised during prediction
    #[error("inference failure: {0}")]
    InferenceFailure(#[from] InferenceError),

    /// The feature schema could not be derived from its source
    #[error("schema unavailable from {path:?}: {reason}")]
    SchemaUnavailable { path: PathBuf, reason: String },
}

impl PredictError {
    pub(crate) fn model_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn schema_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SchemaUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable name of the error category
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::SchemaMismatch(_) => "schema_mismatch",
            PredictError::ModelUnavailable { .. } => "model_unavailable",
            PredictError::InferenceFailure(_) => "inference_failure",
            PredictError::SchemaUnavailable { .. } => "schema_unavailable",
        }
    }
}

/// Ways a patient record can fail to match the schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("feature schema is empty")]
    EmptySchema,

    #[error("field `{0}` appears more than once in the schema")]
    DuplicateField(String),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("unexpected field `{0}`")]
    UnexpectedField(String),

    #[error("field `{field}` is not numeric")]
    NotNumeric { field: String },

    #[error("field `{field}` is not a finite number")]
    NotFinite { field: String },

    #[error("field `{field}` = {value} is outside {domain}")]
    OutOfDomain {
        field: String,
        value: f64,
        domain: String,
    },
}

/// Ways the classifier can fail while scoring a vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("dimensionality mismatch: classifier expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("classifier does not expose a probability for the positive class (classes {classes:?}, {returned} probabilities)")]
    MissingPositiveClass { classes: Vec<i64>, returned: usize },

    #[error("classifier emitted label {0}, expected 0 or 1")]
    UnexpectedLabel(i64),

    #[error("classifier emitted probability {0} outside [0, 1]")]
    InvalidProbability(f32),

    #[error("model execution failed: {0}")]
    Execution(String),
}
