//! Core data models for the risk predictor

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Patient inputs keyed by feature name
///
/// Each request owns its record; nothing about it is shared between
/// concurrent predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientRecord {
    values: BTreeMap<String, f64>,
}

impl PatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Build a record from a JSON object, rejecting non-numeric values
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self, SchemaError> {
        let mut values = BTreeMap::new();
        for (name, value) in object {
            let number = value.as_f64().ok_or_else(|| SchemaError::NotNumeric {
                field: name.clone(),
            })?;
            values.insert(name.clone(), number);
        }
        Ok(Self { values })
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fill absent fields from a defaults map, leaving present ones untouched
    pub fn fill_missing(&mut self, defaults: &BTreeMap<String, f64>) {
        for (name, value) in defaults {
            self.values.entry(name.clone()).or_insert(*value);
        }
    }
}

/// Classifier output for one record
///
/// `label` and `probability` are reported exactly as the classifier emits
/// them; the label is never re-derived from the probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 when disease is predicted present, 0 otherwise
    pub label: u8,
    /// Probability of the positive class, in `[0, 1]`
    pub probability: f32,
}

impl PredictionResult {
    pub fn is_positive(&self) -> bool {
        self.label == 1
    }
}
