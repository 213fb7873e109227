//! Inference adapter: record in, prediction out
//!
//! Precondition: the schema order must be the order the classifier was
//! trained on. The adapter can check the feature count but not the order.

use super::{Classifier, ClassifierCache, ModelSettings};
use crate::error::{InferenceError, Result};
use crate::models::{PatientRecord, PredictionResult};
use crate::schema::{FeatureSchema, SchemaSource};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Class label whose probability is reported ("disease present")
pub const POSITIVE_CLASS: i64 = 1;

/// Validate `record` against `schema`, score it, and report the positive-class probability
///
/// Pure over its inputs: the same record and classifier always yield the
/// same result.
pub fn predict(
    record: &PatientRecord,
    schema: &FeatureSchema,
    classifier: &dyn Classifier,
) -> Result<PredictionResult> {
    let row = schema.assemble(record)?;

    let start = Instant::now();
    let label = classifier.predict(&row)?;
    let probabilities = classifier.predict_proba(&row)?;
    debug!(
        elapsed_us = start.elapsed().as_micros(),
        label,
        "Classifier invoked"
    );

    let probability = positive_probability(classifier.classes(), &probabilities)?;
    let label = match label {
        0 => 0,
        1 => 1,
        other => return Err(InferenceError::UnexpectedLabel(other).into()),
    };

    Ok(PredictionResult { label, probability })
}

/// Probability at the position of the positive class, never an arbitrary index
fn positive_probability(classes: &[i64], probabilities: &[f32]) -> Result<f32, InferenceError> {
    let probability = classes
        .iter()
        .position(|c| *c == POSITIVE_CLASS)
        .and_then(|idx| probabilities.get(idx))
        .copied()
        .ok_or_else(|| InferenceError::MissingPositiveClass {
            classes: classes.to_vec(),
            returned: probabilities.len(),
        })?;

    if !(0.0..=1.0).contains(&probability) {
        return Err(InferenceError::InvalidProbability(probability));
    }
    Ok(probability)
}

/// A feature schema bound to a shared, read-only classifier
#[derive(Clone)]
pub struct InferenceAdapter {
    schema: FeatureSchema,
    classifier: Arc<dyn Classifier>,
}

impl InferenceAdapter {
    pub fn new(schema: FeatureSchema, classifier: Arc<dyn Classifier>) -> Self {
        if schema.len() != classifier.input_width() {
            warn!(
                schema_features = schema.len(),
                classifier_features = classifier.input_width(),
                "Schema width differs from classifier input width, predictions will fail"
            );
        }
        Self { schema, classifier }
    }

    /// Load the schema from `source` and the classifier through `cache`
    pub fn load(
        source: &SchemaSource,
        settings: &ModelSettings,
        cache: &ClassifierCache,
    ) -> Result<Self> {
        let schema = source.provider().load_schema()?;
        let classifier = cache.get_or_load(settings)?;
        Ok(Self::new(schema, classifier))
    }

    pub fn predict(&self, record: &PatientRecord) -> Result<PredictionResult> {
        predict(record, &self.schema, self.classifier.as_ref())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }
}
