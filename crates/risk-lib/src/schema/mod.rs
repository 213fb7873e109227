//! Feature schema: the ordered list of inputs the classifier was trained on
//!
//! The schema order is an external contract with the model artifact. Nothing
//! here can verify it; callers must load a schema whose order matches the
//! order used at training time.

mod reference;

pub use reference::{ReferenceDataset, DEFAULT_LABEL_COLUMN};

use crate::error::{Result, SchemaError};
use crate::models::PatientRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Tolerance used when checking that a value sits on a step boundary
const STEP_TOLERANCE: f64 = 1e-6;

/// Column names of the canonical heart-disease feature list, in training order
pub const HEART_DISEASE_FEATURES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Accepted values of a single feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDomain {
    /// Whole numbers in `[min, max]`
    Integer { min: i64, max: i64 },
    /// Multiples of `step` above `min`, up to `max`
    Stepped { min: f64, max: f64, step: f64 },
    /// One of an enumerated set of codes
    Choice { values: Vec<i64> },
    /// Any finite number
    Unbounded,
}

impl FieldDomain {
    pub fn choice(values: &[i64]) -> Self {
        FieldDomain::Choice {
            values: values.to_vec(),
        }
    }

    /// Check whether a finite value is accepted
    pub fn contains(&self, value: f64) -> bool {
        match self {
            FieldDomain::Integer { min, max } => {
                value.fract() == 0.0 && value >= *min as f64 && value <= *max as f64
            }
            FieldDomain::Stepped { min, max, step } => {
                if value < *min - STEP_TOLERANCE || value > *max + STEP_TOLERANCE {
                    return false;
                }
                let steps = (value - min) / step;
                (steps - steps.round()).abs() < STEP_TOLERANCE * steps.abs().max(1.0)
            }
            FieldDomain::Choice { values } => {
                value.fract() == 0.0 && values.iter().any(|v| *v as f64 == value)
            }
            FieldDomain::Unbounded => value.is_finite(),
        }
    }

    /// Snap an arbitrary value onto the nearest accepted value
    ///
    /// Used for form defaults derived from dataset medians, which may fall
    /// between codes.
    pub fn coerce(&self, value: f64) -> f64 {
        match self {
            FieldDomain::Integer { min, max } => value.round().clamp(*min as f64, *max as f64),
            FieldDomain::Stepped { min, max, step } => {
                let snapped = min + ((value - min) / step).round() * step;
                // strip float drift left by the multiplication
                let scale = 1.0 / step;
                ((snapped * scale).round() / scale).clamp(*min, *max)
            }
            FieldDomain::Choice { values } => values
                .iter()
                .map(|v| *v as f64)
                .min_by(|a, b| {
                    (a - value)
                        .abs()
                        .partial_cmp(&(b - value).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(value),
            FieldDomain::Unbounded => value,
        }
    }
}

impl fmt::Display for FieldDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDomain::Integer { min, max } => write!(f, "integers {}..={}", min, max),
            FieldDomain::Stepped { min, max, step } => {
                write!(f, "{:.1}..={:.1} in steps of {}", min, max, step)
            }
            FieldDomain::Choice { values } => {
                let codes: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", codes.join(","))
            }
            FieldDomain::Unbounded => write!(f, "any finite number"),
        }
    }
}

/// A single named input of the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub label: String,
    pub domain: FieldDomain,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, domain: FieldDomain) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            domain,
        }
    }

    /// Spec for a column that is not part of the canonical list
    pub fn unbounded(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            domain: FieldDomain::Unbounded,
        }
    }

    /// Look up a canonical heart-disease column by name
    pub fn canonical(name: &str) -> Option<Self> {
        let (label, domain) = match name {
            "age" => ("Age", FieldDomain::Integer { min: 18, max: 100 }),
            "sex" => ("Sex (1=Male, 0=Female)", FieldDomain::choice(&[0, 1])),
            "cp" => ("Chest Pain Type", FieldDomain::choice(&[0, 1, 2, 3])),
            "trestbps" => (
                "Resting Blood Pressure",
                FieldDomain::Integer { min: 80, max: 200 },
            ),
            "chol" => ("Cholesterol", FieldDomain::Integer { min: 100, max: 600 }),
            "fbs" => ("Fasting Blood Sugar > 120 mg/dl", FieldDomain::choice(&[0, 1])),
            "restecg" => ("Rest ECG", FieldDomain::choice(&[0, 1, 2])),
            "thalach" => (
                "Max Heart Rate Achieved",
                FieldDomain::Integer { min: 60, max: 250 },
            ),
            "exang" => ("Exercise Induced Angina", FieldDomain::choice(&[0, 1])),
            "oldpeak" => (
                "Oldpeak (ST depression)",
                FieldDomain::Stepped {
                    min: 0.0,
                    max: 6.0,
                    step: 0.1,
                },
            ),
            "slope" => ("Slope", FieldDomain::choice(&[0, 1, 2])),
            "ca" => ("Major Vessels (CA)", FieldDomain::choice(&[0, 1, 2, 3, 4])),
            "thal" => ("Thal", FieldDomain::choice(&[0, 1, 2, 3])),
            _ => return None,
        };
        Some(Self::new(name, label, domain))
    }
}

/// Ordered, immutable, non-empty list of features
///
/// Cloning is cheap; clones share the same field list.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    fields: Arc<[FeatureSpec]>,
}

impl FeatureSchema {
    pub fn new(fields: Vec<FeatureSpec>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self {
            fields: fields.into(),
        })
    }

    /// The canonical 13-column heart-disease schema
    pub fn heart_disease() -> Self {
        let fields = HEART_DISEASE_FEATURES
            .iter()
            .filter_map(|name| FeatureSpec::canonical(name))
            .collect::<Vec<_>>();
        Self {
            fields: fields.into(),
        }
    }

    pub fn fields(&self) -> &[FeatureSpec] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a record and lay it out as a single row in schema order
    ///
    /// Extra fields are rejected, never ignored.
    pub fn assemble(&self, record: &PatientRecord) -> Result<Vec<f32>, SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        if let Some(extra) = record.names().find(|name| self.get(name).is_none()) {
            return Err(SchemaError::UnexpectedField(extra.to_string()));
        }

        let mut row = Vec::with_capacity(self.fields.len());
        for field in self.fields.iter() {
            let value = record
                .get(&field.name)
                .ok_or_else(|| SchemaError::MissingField(field.name.clone()))?;
            if !value.is_finite() {
                return Err(SchemaError::NotFinite {
                    field: field.name.clone(),
                });
            }
            if !field.domain.contains(value) {
                return Err(SchemaError::OutOfDomain {
                    field: field.name.clone(),
                    value,
                    domain: field.domain.to_string(),
                });
            }
            row.push(value as f32);
        }
        Ok(row)
    }
}

/// Strategy for obtaining the feature schema
pub trait FeatureSchemaProvider: Send + Sync {
    fn load_schema(&self) -> Result<FeatureSchema>;

    /// Per-field default values for pre-populating input forms
    fn load_defaults(&self, _schema: &FeatureSchema) -> Result<BTreeMap<String, f64>> {
        Ok(BTreeMap::new())
    }
}

/// The canonical, hardcoded field list
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSchema;

impl FeatureSchemaProvider for FixedSchema {
    fn load_schema(&self) -> Result<FeatureSchema> {
        Ok(FeatureSchema::heart_disease())
    }
}

fn default_label_column() -> String {
    DEFAULT_LABEL_COLUMN.to_string()
}

/// Schema strategy selected at configuration time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaSource {
    /// Use the canonical field list
    #[default]
    Fixed,
    /// Derive the field list from a reference dataset's header row
    Reference {
        path: PathBuf,
        #[serde(default = "default_label_column")]
        label_column: String,
    },
}

impl SchemaSource {
    pub fn provider(&self) -> Box<dyn FeatureSchemaProvider> {
        match self {
            SchemaSource::Fixed => Box::new(FixedSchema),
            SchemaSource::Reference { path, label_column } => {
                Box::new(ReferenceDataset::new(path.clone(), label_column.clone()))
            }
        }
    }
}
