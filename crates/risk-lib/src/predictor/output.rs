//! Prediction output formatting for display
//!
//! Converts a raw [`PredictionResult`] into the verdict message, percentage
//! and gauge parameters shown to the user. The verdict always follows the
//! classifier's label, never the rounded percentage.

use crate::models::PredictionResult;
use serde::{Deserialize, Serialize};

/// Caption shown under the gauge
pub const GAUGE_LABEL: &str = "Heart Disease Risk Level";

/// Percentage at and above which the gauge is drawn in the alarm color
pub const HIGH_RISK_PERCENT: u8 = 50;

/// Degrees of arc per percentage point on a full-circle gauge
const DEGREES_PER_PERCENT: f32 = 3.6;

const HIGH_RISK_COLOR: &str = "#ff4b4b";
const LOW_RISK_COLOR: &str = "#2e9e5b";
const TRACK_COLOR: &str = "#e6e6e6";

/// Convert a probability fraction into a whole percentage in 0..=100
pub fn to_percentage(probability: f32) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// User-facing verdict for a prediction
pub fn verdict_message(result: &PredictionResult) -> String {
    if result.is_positive() {
        format!(
            "High chance of Heart Disease (Confidence: {:.2})",
            result.probability
        )
    } else {
        format!(
            "No Heart Disease Detected (Confidence: {:.2})",
            result.probability
        )
    }
}

/// Visual parameters for a circular percentage gauge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeParams {
    pub label: String,
    pub percent: u8,
    /// Filled arc, `percent * 3.6` degrees
    pub sweep_degrees: f32,
    pub fill_color: String,
    pub track_color: String,
}

impl GaugeParams {
    pub fn new(label: impl Into<String>, percent: u8) -> Self {
        let percent = percent.min(100);
        let fill_color = if percent >= HIGH_RISK_PERCENT {
            HIGH_RISK_COLOR
        } else {
            LOW_RISK_COLOR
        };
        Self {
            label: label.into(),
            percent,
            sweep_degrees: percent as f32 * DEGREES_PER_PERCENT,
            fill_color: fill_color.to_string(),
            track_color: TRACK_COLOR.to_string(),
        }
    }
}

/// Everything the presentation layer needs for one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub label: u8,
    pub probability: f32,
    pub percentage: u8,
    pub message: String,
    pub gauge: GaugeParams,
    pub model_version: String,
    pub generated_at: i64,
}

impl RiskReport {
    pub fn new(result: &PredictionResult, model_version: &str) -> Self {
        let percentage = to_percentage(result.probability);
        Self {
            label: result.label,
            probability: result.probability,
            percentage,
            message: verdict_message(result),
            gauge: GaugeParams::new(GAUGE_LABEL, percentage),
            model_version: model_version.to_string(),
            generated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// The prediction this report was built from
    pub fn result(&self) -> PredictionResult {
        PredictionResult {
            label: self.label,
            probability: self.probability,
        }
    }

    pub fn is_high_risk(&self) -> bool {
        self.label == 1
    }
}
