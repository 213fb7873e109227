//! Classifier artifact loading with optional checksum validation

use super::{Classifier, LogisticClassifier, OnnxClassifier, OnnxOutputs};
use crate::error::{PredictError, Result};
use crate::schema::HEART_DISEASE_FEATURES;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Serialization format of the model artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Infer from the file extension
    #[default]
    Auto,
    Onnx,
    Logistic,
}

/// Concrete artifact kind once `Auto` has been resolved
#[derive(Debug, Clone, Copy)]
enum ArtifactKind {
    Onnx,
    Logistic,
}

impl ModelFormat {
    fn resolve(self, path: &Path) -> Result<ArtifactKind> {
        match self {
            ModelFormat::Onnx => return Ok(ArtifactKind::Onnx),
            ModelFormat::Logistic => return Ok(ArtifactKind::Logistic),
            ModelFormat::Auto => {}
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => Ok(ArtifactKind::Onnx),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ArtifactKind::Logistic),
            _ => Err(PredictError::model_unavailable(
                path,
                "cannot infer model format from file extension, set it explicitly",
            )),
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/stack_model.onnx")
}

fn default_input_width() -> usize {
    HEART_DISEASE_FEATURES.len()
}

fn default_probability_output() -> usize {
    1
}

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

/// Where and how to load the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub format: ModelFormat,

    /// Feature count the ONNX graph was trained on
    #[serde(default = "default_input_width")]
    pub input_width: usize,

    /// ONNX output index holding the predicted label
    #[serde(default)]
    pub label_output: usize,

    /// ONNX output index holding the class probabilities
    #[serde(default = "default_probability_output")]
    pub probability_output: usize,

    /// Class labels in probability order (ONNX only)
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,

    /// Expected hex SHA-256 of the artifact
    #[serde(default)]
    pub sha256: Option<String>,

    /// Version reported for the artifact; the file stem when unset (ONNX only)
    #[serde(default)]
    pub version: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::new(default_model_path())
    }
}

impl ModelSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: ModelFormat::Auto,
            input_width: default_input_width(),
            label_output: 0,
            probability_output: default_probability_output(),
            classes: default_classes(),
            sha256: None,
            version: None,
        }
    }

    fn version_or_stem(&self) -> String {
        self.version.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string())
        })
    }
}

/// Compute the hex-encoded SHA-256 of a byte slice
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Read, validate and deserialize the classifier artifact
///
/// Every failure (missing file, checksum mismatch, corrupt content) is
/// reported as [`PredictError::ModelUnavailable`].
pub fn load_classifier(settings: &ModelSettings) -> Result<Arc<dyn Classifier>> {
    let path = &settings.path;
    let bytes = std::fs::read(path).map_err(|e| PredictError::model_unavailable(path, e))?;

    if let Some(expected) = &settings.sha256 {
        let computed = compute_checksum(&bytes);
        if !computed.eq_ignore_ascii_case(expected.trim()) {
            return Err(PredictError::model_unavailable(
                path,
                format!("checksum mismatch: expected {}, got {}", expected, computed),
            ));
        }
    }

    let kind = settings.format.resolve(path)?;
    let classifier: Arc<dyn Classifier> = match kind {
        ArtifactKind::Onnx => {
            let outputs = OnnxOutputs {
                label: settings.label_output,
                probabilities: settings.probability_output,
            };
            let model = OnnxClassifier::from_bytes(
                &bytes,
                settings.input_width,
                outputs,
                settings.classes.clone(),
                settings.version_or_stem(),
            )
            .map_err(|e| PredictError::model_unavailable(path, format!("{:#}", e)))?;
            Arc::new(model)
        }
        ArtifactKind::Logistic => {
            let model = LogisticClassifier::from_json(&bytes)
                .map_err(|e| PredictError::model_unavailable(path, format!("{:#}", e)))?;
            Arc::new(model)
        }
    };

    info!(
        path = ?path,
        format = ?kind,
        size = bytes.len(),
        input_width = classifier.input_width(),
        version = %classifier.version(),
        "Classifier loaded"
    );
    Ok(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const LOGISTIC_JSON: &str = r#"{"coefficients":[0.1,0.2],"intercept":-0.5,"version":"lr-1"}"#;

    fn write_model(suffix: &str, content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_model_unavailable() {
        let settings = ModelSettings::new("/nonexistent/models/stack_model.onnx");
        let err = load_classifier(&settings).err().unwrap();
        assert_eq!(err.kind(), "model_unavailable");
    }

    #[test]
    fn test_logistic_loaded_by_extension() {
        let file = write_model(".json", LOGISTIC_JSON.as_bytes());
        let classifier = load_classifier(&ModelSettings::new(file.path())).unwrap();
        assert_eq!(classifier.input_width(), 2);
        assert_eq!(classifier.version(), "lr-1");
    }

    #[test]
    fn test_corrupt_onnx_is_model_unavailable() {
        let file = write_model(".onnx", b"\x00\x01garbage");
        let err = load_classifier(&ModelSettings::new(file.path())).err().unwrap();
        assert!(matches!(err, PredictError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_onnx_loaded_by_extension() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/logistic_proba_first.onnx");
        let mut settings = ModelSettings::new(&path);
        settings.label_output = 1;
        settings.probability_output = 0;

        let classifier = load_classifier(&settings).unwrap();
        assert_eq!(classifier.version(), "logistic_proba_first");
        assert_eq!(classifier.input_width(), 13);

        let row = [45.0, 1.0, 2.0, 130.0, 250.0, 0.0, 1.0, 165.0, 0.0, 1.2, 1.0, 0.0, 2.0];
        assert_eq!(classifier.predict(&row).unwrap(), 1);
        assert_eq!(classifier.predict_proba(&row).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_extension_requires_format() {
        let file = write_model(".pkl", LOGISTIC_JSON.as_bytes());
        let mut settings = ModelSettings::new(file.path());
        assert!(load_classifier(&settings).is_err());

        settings.format = ModelFormat::Logistic;
        assert!(load_classifier(&settings).is_ok());
    }

    #[test]
    fn test_checksum_validated() {
        let file = write_model(".json", LOGISTIC_JSON.as_bytes());
        let mut settings = ModelSettings::new(file.path());

        settings.sha256 = Some(compute_checksum(LOGISTIC_JSON.as_bytes()).to_uppercase());
        assert!(load_classifier(&settings).is_ok());

        settings.sha256 = Some("00".repeat(32));
        let err = load_classifier(&settings).err().unwrap();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_checksum_known_value() {
        assert_eq!(
            compute_checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_settings_defaults_from_json() {
        let settings: ModelSettings = serde_json::from_str(r#"{"path":"m.onnx"}"#).unwrap();
        assert_eq!(settings.input_width, 13);
        assert_eq!(settings.label_output, 0);
        assert_eq!(settings.probability_output, 1);
        assert_eq!(settings.classes, vec![0, 1]);
        assert_eq!(settings.format, ModelFormat::Auto);
    }
}
