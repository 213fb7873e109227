//! CLI subcommands and the record/schema plumbing they share

pub mod predict;
pub mod schema;
pub mod submit;

use anyhow::{Context, Result};
use risk_lib::predictor::{ModelFormat, ModelSettings};
use risk_lib::{PatientRecord, SchemaSource};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::{ModelArgs, ModelFormatArg, RecordArgs, SchemaArgs};

/// Problems with record input given on the command line
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("expected NAME=VALUE, got `{0}`")]
    MalformedAssignment(String),

    #[error("value for `{name}` is not a number: `{value}`")]
    NotNumeric { name: String, value: String },

    #[error("record file must contain a JSON object")]
    NotAnObject,
}

/// Parse a `name=value` assignment
pub fn parse_assignment(raw: &str) -> Result<(String, f64), InputError> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| InputError::MalformedAssignment(raw.to_string()))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(InputError::MalformedAssignment(raw.to_string()));
    }

    let value = value.trim();
    let parsed = value.parse::<f64>().map_err(|_| InputError::NotNumeric {
        name: name.to_string(),
        value: value.to_string(),
    })?;

    Ok((name.to_string(), parsed))
}

fn read_record_file(path: &Path) -> Result<PatientRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read record file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse record file {}", path.display()))?;

    let object = value.as_object().ok_or(InputError::NotAnObject)?;
    Ok(PatientRecord::from_json(object)?)
}

impl RecordArgs {
    /// Build the record from `--input`, then apply each `--set`
    pub fn to_record(&self) -> Result<PatientRecord> {
        let mut record = match &self.input {
            Some(path) => read_record_file(path)?,
            None => PatientRecord::new(),
        };

        for raw in &self.set {
            let (name, value) = parse_assignment(raw)?;
            record.insert(name, value);
        }

        Ok(record)
    }
}

impl From<ModelFormatArg> for ModelFormat {
    fn from(arg: ModelFormatArg) -> Self {
        match arg {
            ModelFormatArg::Auto => ModelFormat::Auto,
            ModelFormatArg::Onnx => ModelFormat::Onnx,
            ModelFormatArg::Logistic => ModelFormat::Logistic,
        }
    }
}

impl ModelArgs {
    /// Loader settings from the flags, with `fallback` as the path when `--model` is absent
    pub fn to_settings(&self, fallback: Option<PathBuf>) -> Result<ModelSettings> {
        let path = self.model.clone().or(fallback).context(
            "No model given: pass --model, set HRP_MODEL, or add model_path to ~/.config/hrp/config.json",
        )?;

        let mut settings = ModelSettings::new(path);
        settings.format = self.model_format.into();
        settings.sha256 = self.sha256.clone();
        if let Some(width) = self.input_width {
            settings.input_width = width;
        }
        if let Some(index) = self.label_output {
            settings.label_output = index;
        }
        if let Some(index) = self.probability_output {
            settings.probability_output = index;
        }
        Ok(settings)
    }
}

impl SchemaArgs {
    pub fn source(&self) -> SchemaSource {
        match &self.reference {
            Some(path) => SchemaSource::Reference {
                path: path.clone(),
                label_column: self.label_column.clone(),
            },
            None => SchemaSource::Fixed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("age=45").unwrap(), ("age".to_string(), 45.0));
        assert_eq!(
            parse_assignment(" oldpeak = 1.2 ").unwrap(),
            ("oldpeak".to_string(), 1.2)
        );
        assert_eq!(
            parse_assignment("age"),
            Err(InputError::MalformedAssignment("age".to_string()))
        );
        assert_eq!(
            parse_assignment("=3"),
            Err(InputError::MalformedAssignment("=3".to_string()))
        );
        assert_eq!(
            parse_assignment("sex=male"),
            Err(InputError::NotNumeric {
                name: "sex".to_string(),
                value: "male".to_string()
            })
        );
    }

    #[test]
    fn test_set_overrides_input_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"age": 45, "chol": 250}}"#).unwrap();

        let args = RecordArgs {
            input: Some(file.path().to_path_buf()),
            set: vec!["age=61".to_string(), "thal=2".to_string()],
        };
        let record = args.to_record().unwrap();

        assert_eq!(record.get("age"), Some(61.0));
        assert_eq!(record.get("chol"), Some(250.0));
        assert_eq!(record.get("thal"), Some(2.0));
    }

    #[test]
    fn test_record_file_must_be_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[45, 1, 2]").unwrap();

        let args = RecordArgs {
            input: Some(file.path().to_path_buf()),
            set: Vec::new(),
        };
        assert!(args.to_record().is_err());
    }

    #[test]
    fn test_schema_source_selection() {
        let fixed = SchemaArgs {
            reference: None,
            label_column: "target".to_string(),
        };
        assert_eq!(fixed.source(), SchemaSource::Fixed);

        let reference = SchemaArgs {
            reference: Some("heart.csv".into()),
            label_column: "num".to_string(),
        };
        assert!(matches!(
            reference.source(),
            SchemaSource::Reference { ref label_column, .. } if label_column == "num"
        ));
    }

    fn model_args(model: Option<&str>) -> ModelArgs {
        ModelArgs {
            model: model.map(PathBuf::from),
            model_format: ModelFormatArg::Auto,
            sha256: None,
            input_width: None,
            label_output: None,
            probability_output: None,
        }
    }

    #[test]
    fn test_model_settings_defaults() {
        let settings = model_args(Some("models/stack_model.onnx"))
            .to_settings(None)
            .unwrap();
        assert_eq!(settings, ModelSettings::new("models/stack_model.onnx"));
    }

    #[test]
    fn test_model_settings_from_flags() {
        let args = ModelArgs {
            model_format: ModelFormatArg::Onnx,
            sha256: Some("ab12".to_string()),
            input_width: Some(11),
            label_output: Some(1),
            probability_output: Some(0),
            ..model_args(Some("stack.bin"))
        };
        let settings = args.to_settings(None).unwrap();

        assert_eq!(settings.path, PathBuf::from("stack.bin"));
        assert_eq!(settings.format, ModelFormat::Onnx);
        assert_eq!(settings.sha256.as_deref(), Some("ab12"));
        assert_eq!(settings.input_width, 11);
        assert_eq!(settings.label_output, 1);
        assert_eq!(settings.probability_output, 0);
    }

    #[test]
    fn test_model_path_falls_back_to_config() {
        let settings = model_args(None)
            .to_settings(Some(PathBuf::from("configured.json")))
            .unwrap();
        assert_eq!(settings.path, PathBuf::from("configured.json"));

        let settings = model_args(Some("flag.json"))
            .to_settings(Some(PathBuf::from("configured.json")))
            .unwrap();
        assert_eq!(settings.path, PathBuf::from("flag.json"));

        let err = model_args(None).to_settings(None).unwrap_err();
        assert!(err.to_string().contains("No model given"));
    }
}
