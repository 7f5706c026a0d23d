use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors raised while decoding service payloads into typed records.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The fourteen clinical features accepted by `POST /predict`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub age: f64,
    pub gender: f64,
    pub pulse_rate: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub glucose: f64,
    pub height: f64,
    pub weight: f64,
    pub bmi: f64,
    pub family_diabetes: f64,
    pub hypertensive: f64,
    pub family_hypertension: f64,
    pub cardiovascular_disease: f64,
    pub stroke: f64,
}

impl PredictionInput {
    pub const FIELD_NAMES: [&'static str; 14] = [
        "age",
        "gender",
        "pulse_rate",
        "systolic_bp",
        "diastolic_bp",
        "glucose",
        "height",
        "weight",
        "bmi",
        "family_diabetes",
        "hypertensive",
        "family_hypertension",
        "cardiovascular_disease",
        "stroke",
    ];

    /// Feature values paired with their wire names, in request order.
    pub fn fields(&self) -> [(&'static str, f64); 14] {
        [
            ("age", self.age),
            ("gender", self.gender),
            ("pulse_rate", self.pulse_rate),
            ("systolic_bp", self.systolic_bp),
            ("diastolic_bp", self.diastolic_bp),
            ("glucose", self.glucose),
            ("height", self.height),
            ("weight", self.weight),
            ("bmi", self.bmi),
            ("family_diabetes", self.family_diabetes),
            ("hypertensive", self.hypertensive),
            ("family_hypertension", self.family_hypertension),
            ("cardiovascular_disease", self.cardiovascular_disease),
            ("stroke", self.stroke),
        ]
    }
}

/// A single logged prediction, as delivered by `/recent` and the `/events` stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(flatten)]
    pub features: PredictionInput,
    #[serde(deserialize_with = "deserialize_label")]
    pub prediction: u8,
    pub timestamp: String,
}

impl PredictionRecord {
    /// Decode one event payload. Callers treat failure as a droppable message.
    pub fn from_json(payload: &str) -> Result<Self, RecordError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn is_positive(&self) -> bool {
        self.prediction == 1
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(deserialize_with = "deserialize_label")]
    pub prediction: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    pub model_loaded: bool,
    #[serde(default)]
    pub model_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingResponse {
    pub status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingLogEntry {
    #[serde(deserialize_with = "deserialize_text")]
    pub timestamp: String,
    #[serde(default)]
    pub action: String,
}

/// Result of `GET /drift`.
///
/// The service has shipped both `drift`/`shifts` and `drift_detected`/`feature_shifts`
/// field names; both spellings are accepted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftResponse {
    #[serde(alias = "drift")]
    pub drift_detected: bool,
    #[serde(default)]
    pub drift_score: f64,
    #[serde(default, alias = "shifts", skip_serializing_if = "Option::is_none")]
    pub feature_shifts: Option<BTreeMap<String, f64>>,
}

impl DriftResponse {
    /// Feature shifts ordered by magnitude, largest first.
    pub fn ranked_shifts(&self) -> Vec<(String, f64)> {
        let mut shifts: Vec<(String, f64)> = self
            .feature_shifts
            .as_ref()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();
        shifts.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        shifts
    }
}

/// One row of `GET /drift_log`. `feature_shifts` stays the JSON-encoded string the
/// service stores; use [`DriftLogEntry::parsed_shifts`] to decode it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftLogEntry {
    #[serde(deserialize_with = "deserialize_text")]
    pub timestamp: String,
    #[serde(alias = "drift")]
    pub drift_detected: bool,
    #[serde(default)]
    pub drift_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shift: Option<f64>,
    #[serde(default, alias = "shifts", skip_serializing_if = "Option::is_none")]
    pub feature_shifts: Option<String>,
}

impl DriftLogEntry {
    pub fn parsed_shifts(&self) -> BTreeMap<String, f64> {
        self.feature_shifts
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Int(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

fn deserialize_label<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let label = match RawLabel::deserialize(deserializer)? {
        RawLabel::Int(value) => value,
        RawLabel::Float(value) if value.fract() == 0.0 => value as i64,
        RawLabel::Float(value) => {
            return Err(D::Error::custom(format!("prediction {value} is not a class label")))
        }
        RawLabel::Flag(flag) => i64::from(flag),
        RawLabel::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("prediction {text:?} is not a class label")))?,
    };
    match label {
        0 | 1 => Ok(label as u8),
        other => Err(D::Error::custom(format!(
            "prediction must be 0 or 1, got {other}"
        ))),
    }
}

/// Timestamps are strings on the wire, but CSV-backed endpoints occasionally hand
/// back bare numbers.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}
