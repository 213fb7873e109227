//! Schema derivation from a reference dataset
//!
//! The dataset is only read for its header row (schema order) and for
//! per-column medians used as form defaults. It is never used for training.

use super::{FeatureSchema, FeatureSchemaProvider, FeatureSpec};
use crate::error::{PredictError, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the label column in the canonical heart-disease dataset
pub const DEFAULT_LABEL_COLUMN: &str = "target";

/// CSV file whose header gives the feature order
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    path: PathBuf,
    label_column: String,
}

impl ReferenceDataset {
    pub fn new(path: impl Into<PathBuf>, label_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label_column: label_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<csv::Reader<File>> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| PredictError::schema_unavailable(&self.path, e))
    }

    /// Header names in file order, minus the label column
    fn feature_columns(&self, reader: &mut csv::Reader<File>) -> Result<Vec<(usize, String)>> {
        let headers = reader
            .headers()
            .map_err(|e| PredictError::schema_unavailable(&self.path, e))?
            .clone();

        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err(PredictError::schema_unavailable(&self.path, "no header row"));
        }
        if !headers.iter().any(|h| h == self.label_column) {
            warn!(
                path = ?self.path,
                label_column = %self.label_column,
                "Label column not found, treating every column as a feature"
            );
        }

        let columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| *name != self.label_column)
            .map(|(idx, name)| (idx, name.to_string()))
            .collect();

        if columns.is_empty() {
            return Err(PredictError::schema_unavailable(
                &self.path,
                "no feature columns besides the label",
            ));
        }
        Ok(columns)
    }
}

impl FeatureSchemaProvider for ReferenceDataset {
    fn load_schema(&self) -> Result<FeatureSchema> {
        let mut reader = self.open()?;
        let columns = self.feature_columns(&mut reader)?;

        let fields = columns
            .into_iter()
            .map(|(_, name)| {
                FeatureSpec::canonical(&name).unwrap_or_else(|| {
                    warn!(column = %name, "Unknown feature column, accepting any finite value");
                    FeatureSpec::unbounded(name)
                })
            })
            .collect();

        let schema = FeatureSchema::new(fields)
            .map_err(|e| PredictError::schema_unavailable(&self.path, e))?;
        debug!(path = ?self.path, features = schema.len(), "Derived schema from reference dataset");
        Ok(schema)
    }

    /// Column medians, snapped onto each field's domain
    ///
    /// Cells that do not parse as numbers are skipped. Columns with no
    /// parseable cells get no default.
    fn load_defaults(&self, schema: &FeatureSchema) -> Result<BTreeMap<String, f64>> {
        let mut reader = self.open()?;
        let columns = self.feature_columns(&mut reader)?;

        let mut samples: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
        for row in reader.records() {
            let row = row.map_err(|e| PredictError::schema_unavailable(&self.path, e))?;
            for (slot, (idx, _)) in columns.iter().enumerate() {
                if let Some(value) = row.get(*idx).and_then(|cell| cell.parse::<f64>().ok()) {
                    if value.is_finite() {
                        samples[slot].push(value);
                    }
                }
            }
        }

        let mut defaults = BTreeMap::new();
        for ((_, name), mut values) in columns.into_iter().zip(samples) {
            let Some(spec) = schema.get(&name) else {
                continue;
            };
            if let Some(m) = median(&mut values) {
                defaults.insert(name, spec.domain.coerce(m));
            }
        }
        Ok(defaults)
    }
}

/// Median with the two middle values averaged for even-length input
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDomain, HEART_DISEASE_FEATURES};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEART_CSV: &str = "\
age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,target
52,1,0,125,212,0,1,168,0,1.0,2,2,3,0
53,1,0,140,203,1,0,155,1,3.1,0,0,3,0
70,1,0,145,174,0,1,125,1,2.6,0,0,3,0
61,1,0,148,203,0,1,161,0,0.0,2,1,3,0
62,0,0,138,294,1,1,106,0,1.9,1,3,2,0
58,0,0,100,248,0,0,122,0,1.0,1,0,2,1
";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_schema_from_headers_excludes_label() {
        let file = write_csv(HEART_CSV);
        let dataset = ReferenceDataset::new(file.path(), DEFAULT_LABEL_COLUMN);
        let schema = dataset.load_schema().unwrap();

        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, HEART_DISEASE_FEATURES.to_vec());
        assert_eq!(schema, FeatureSchema::heart_disease());
    }

    #[test]
    fn test_unknown_column_is_unbounded() {
        let file = write_csv("age,bmi,target\n50,22.5,1\n");
        let dataset = ReferenceDataset::new(file.path(), "target");
        let schema = dataset.load_schema().unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.get("bmi").unwrap().domain, FieldDomain::Unbounded);
    }

    #[test]
    fn test_missing_file_is_schema_unavailable() {
        let dataset = ReferenceDataset::new("/nonexistent/heart.csv", "target");
        let err = dataset.load_schema().unwrap_err();
        assert_eq!(err.kind(), "schema_unavailable");
    }

    #[test]
    fn test_label_only_file_is_schema_unavailable() {
        let file = write_csv("target\n1\n0\n");
        let dataset = ReferenceDataset::new(file.path(), "target");
        assert!(matches!(
            dataset.load_schema(),
            Err(PredictError::SchemaUnavailable { .. })
        ));
    }

    #[test]
    fn test_defaults_are_medians_snapped_to_domain() {
        let file = write_csv(HEART_CSV);
        let dataset = ReferenceDataset::new(file.path(), DEFAULT_LABEL_COLUMN);
        let schema = dataset.load_schema().unwrap();
        let defaults = dataset.load_defaults(&schema).unwrap();

        assert_eq!(defaults.len(), 13);
        assert!(!defaults.contains_key("target"));
        // ages 52,53,58,61,62,70 -> median 59.5 -> snapped to 60
        assert_eq!(defaults["age"], 60.0);
        // oldpeak 0.0,1.0,1.0,1.9,2.6,3.1 -> median 1.45 -> a valid step value
        let oldpeak = defaults["oldpeak"];
        assert!(schema.get("oldpeak").unwrap().domain.contains(oldpeak));
        for (name, value) in &defaults {
            assert!(
                schema.get(name).unwrap().domain.contains(*value),
                "default for {} = {} is outside its domain",
                name,
                value
            );
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }
}
