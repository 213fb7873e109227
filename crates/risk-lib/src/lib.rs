//! Heart disease risk prediction library
//!
//! This crate provides the core functionality for:
//! - Feature schemas, fixed or derived from a reference dataset
//! - Patient record validation against the form domains
//! - Loading and caching a pre-trained binary classifier
//! - The inference adapter and display formatting
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;

pub use error::{InferenceError, PredictError, SchemaError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{Classifier, ClassifierCache, InferenceAdapter, RiskReport};
pub use schema::{FeatureSchema, FeatureSchemaProvider, FeatureSpec, FieldDomain, SchemaSource};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::InferenceError;
    use crate::models::PatientRecord;
    use crate::predictor::Classifier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// The worked example record from the form defaults
    pub fn canonical_record() -> PatientRecord {
        PatientRecord::from_pairs([
            ("age", 45.0),
            ("sex", 1.0),
            ("cp", 2.0),
            ("trestbps", 130.0),
            ("chol", 250.0),
            ("fbs", 0.0),
            ("restecg", 1.0),
            ("thalach", 165.0),
            ("exang", 0.0),
            ("oldpeak", 1.2),
            ("slope", 1.0),
            ("ca", 0.0),
            ("thal", 2.0),
        ])
    }

    /// Classifier returning fixed outputs and recording what it was given
    pub struct StubClassifier {
        label: i64,
        probability: f32,
        classes: Vec<i64>,
        calls: AtomicUsize,
        last_input: Mutex<Vec<f32>>,
    }

    impl StubClassifier {
        pub fn new(label: i64, probability: f32) -> Self {
            Self {
                label,
                probability,
                classes: vec![0, 1],
                calls: AtomicUsize::new(0),
                last_input: Mutex::new(Vec::new()),
            }
        }

        pub fn with_classes(mut self, classes: Vec<i64>) -> Self {
            self.classes = classes;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_input(&self) -> Vec<f32> {
            self.last_input.lock().unwrap().clone()
        }

        fn record(&self, features: &[f32]) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_input.lock().unwrap() = features.to_vec();
        }
    }

    impl Classifier for StubClassifier {
        fn predict(&self, features: &[f32]) -> Result<i64, InferenceError> {
            self.record(features);
            Ok(self.label)
        }

        fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError> {
            self.record(features);
            Ok(vec![1.0 - self.probability, self.probability])
        }

        fn classes(&self) -> &[i64] {
            &self.classes
        }

        fn input_width(&self) -> usize {
            13
        }

        fn version(&self) -> &str {
            "stub"
        }
    }
}
