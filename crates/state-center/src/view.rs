//! Reconciliation of the streamed buffer with polled snapshots.
//!
//! Everything here is a pure function of [`ViewInputs`]; the caller recomputes the view
//! whenever any input changes and never mutates a [`ReconciledView`] in place.

use std::collections::BTreeMap;

use driftwatch_core_types::{
    ConnectionIndicator, ConnectionState, DriftLogEntry, DriftResponse, HealthResponse,
    ModelStatus, PredictionRecord, SeriesKey, TrainingLogEntry,
};
use serde::Serialize;

/// Which input the prediction series was taken from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Stream,
    Snapshot,
    Empty,
}

/// Loading / error / staleness of one polled series.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SeriesFlags {
    pub loading: bool,
    pub in_flight: bool,
    pub stale: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ViewInputs {
    /// Buffer snapshot, newest first.
    pub stream: Vec<PredictionRecord>,
    pub connection: ConnectionState,
    pub connection_notice: Option<String>,
    pub health: Option<HealthResponse>,
    pub drift: Option<DriftResponse>,
    pub drift_log: Option<Vec<DriftLogEntry>>,
    pub training_log: Option<Vec<TrainingLogEntry>>,
    pub recent: Option<Vec<PredictionRecord>>,
    pub series: BTreeMap<SeriesKey, SeriesFlags>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReconciledView {
    pub predictions: Vec<PredictionRecord>,
    pub prediction_source: PredictionSource,
    /// Most recent event received over the stream, if any.
    pub latest_prediction: Option<PredictionRecord>,
    pub positive_rate: Option<f64>,
    pub model_status: ModelStatus,
    pub model_type: Option<String>,
    pub connection: ConnectionIndicator,
    pub connection_state: ConnectionState,
    pub connection_notice: Option<String>,
    pub drift_detected: bool,
    pub drift_score: f64,
    pub feature_shifts: Vec<(String, f64)>,
    pub drift_checks: usize,
    pub drift_log: Vec<DriftLogEntry>,
    pub training_log: Vec<TrainingLogEntry>,
    pub series: BTreeMap<SeriesKey, SeriesFlags>,
}

impl Default for ReconciledView {
    fn default() -> Self {
        reconcile(&ViewInputs::default())
    }
}

/// Stream contents when the buffer has anything, else the polled snapshot, else nothing.
pub fn prediction_series(
    stream: &[PredictionRecord],
    recent: Option<&[PredictionRecord]>,
) -> (Vec<PredictionRecord>, PredictionSource) {
    if !stream.is_empty() {
        return (stream.to_vec(), PredictionSource::Stream);
    }
    match recent {
        Some(snapshot) if !snapshot.is_empty() => (snapshot.to_vec(), PredictionSource::Snapshot),
        _ => (Vec::new(), PredictionSource::Empty),
    }
}

/// An unloaded (or unknown) model dominates drift.
pub fn model_status(health: Option<&HealthResponse>, drift: Option<&DriftResponse>) -> ModelStatus {
    let loaded = health.map(|h| h.model_loaded).unwrap_or(false);
    if !loaded {
        return ModelStatus::Error;
    }
    if drift.map(|d| d.drift_detected).unwrap_or(false) {
        ModelStatus::Drift
    } else {
        ModelStatus::Healthy
    }
}

pub fn reconcile(inputs: &ViewInputs) -> ReconciledView {
    let (predictions, prediction_source) =
        prediction_series(&inputs.stream, inputs.recent.as_deref());

    let positive_rate = if predictions.is_empty() {
        None
    } else {
        let positives = predictions.iter().filter(|p| p.is_positive()).count();
        Some(positives as f64 / predictions.len() as f64)
    };

    let drift_log = inputs.drift_log.clone().unwrap_or_default();

    ReconciledView {
        latest_prediction: inputs.stream.first().cloned(),
        positive_rate,
        model_status: model_status(inputs.health.as_ref(), inputs.drift.as_ref()),
        model_type: inputs
            .health
            .as_ref()
            .map(|h| h.model_type.clone())
            .filter(|t| !t.is_empty()),
        connection: ConnectionIndicator::from(inputs.connection),
        connection_state: inputs.connection,
        connection_notice: inputs.connection_notice.clone(),
        drift_detected: inputs.drift.as_ref().map(|d| d.drift_detected).unwrap_or(false),
        drift_score: inputs.drift.as_ref().map(|d| d.drift_score).unwrap_or(0.0),
        feature_shifts: inputs
            .drift
            .as_ref()
            .map(DriftResponse::ranked_shifts)
            .unwrap_or_default(),
        drift_checks: drift_log.len(),
        drift_log,
        training_log: inputs.training_log.clone().unwrap_or_default(),
        series: inputs.series.clone(),
        predictions,
        prediction_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_core_types::PredictionInput;

    fn record(ts: &str, prediction: u8) -> PredictionRecord {
        PredictionRecord {
            features: PredictionInput::default(),
            prediction,
            timestamp: ts.to_string(),
        }
    }

    fn health(loaded: bool) -> HealthResponse {
        HealthResponse {
            status: "ok".into(),
            model_loaded: loaded,
            model_type: "RandomForestClassifier".into(),
        }
    }

    fn drift(detected: bool) -> DriftResponse {
        DriftResponse {
            drift_detected: detected,
            drift_score: 0.2,
            feature_shifts: None,
        }
    }

    #[test]
    fn unloaded_model_dominates_drift() {
        assert_eq!(
            model_status(Some(&health(false)), Some(&drift(true))),
            ModelStatus::Error
        );
    }

    #[test]
    fn loaded_model_with_drift() {
        assert_eq!(
            model_status(Some(&health(true)), Some(&drift(true))),
            ModelStatus::Drift
        );
    }

    #[test]
    fn loaded_model_without_drift() {
        assert_eq!(
            model_status(Some(&health(true)), Some(&drift(false))),
            ModelStatus::Healthy
        );
    }

    #[test]
    fn unknown_health_is_error_and_unknown_drift_is_healthy() {
        assert_eq!(model_status(None, Some(&drift(false))), ModelStatus::Error);
        assert_eq!(model_status(Some(&health(true)), None), ModelStatus::Healthy);
    }

    #[test]
    fn snapshot_used_while_stream_empty_then_stream_wins() {
        let snapshot = vec![record("s1", 0), record("s2", 1)];
        let mut inputs = ViewInputs {
            recent: Some(snapshot.clone()),
            ..ViewInputs::default()
        };

        let view = reconcile(&inputs);
        assert_eq!(view.prediction_source, PredictionSource::Snapshot);
        assert_eq!(view.predictions, snapshot);
        assert!(view.latest_prediction.is_none());

        inputs.stream = vec![record("e1", 1)];
        let view = reconcile(&inputs);
        assert_eq!(view.prediction_source, PredictionSource::Stream);
        assert_eq!(view.predictions, vec![record("e1", 1)]);
        assert_eq!(view.latest_prediction, Some(record("e1", 1)));
    }

    #[test]
    fn empty_everything_yields_empty_series() {
        let view = reconcile(&ViewInputs {
            recent: Some(Vec::new()),
            ..ViewInputs::default()
        });
        assert_eq!(view.prediction_source, PredictionSource::Empty);
        assert!(view.predictions.is_empty());
        assert_eq!(view.positive_rate, None);
    }

    #[test]
    fn connection_indicator_follows_state() {
        let mut inputs = ViewInputs::default();
        assert_eq!(reconcile(&inputs).connection, ConnectionIndicator::Disconnected);

        inputs.connection = ConnectionState::Open;
        assert_eq!(reconcile(&inputs).connection, ConnectionIndicator::Live);

        inputs.connection = ConnectionState::Reconnecting;
        inputs.connection_notice = Some("Connection lost. Reconnecting...".into());
        let view = reconcile(&inputs);
        assert_eq!(view.connection, ConnectionIndicator::Disconnected);
        assert_eq!(
            view.connection_notice.as_deref(),
            Some("Connection lost. Reconnecting...")
        );
    }

    #[test]
    fn dashboard_figures() {
        let mut shifts = BTreeMap::new();
        shifts.insert("bmi".to_string(), 0.05);
        shifts.insert("glucose".to_string(), -0.4);
        let inputs = ViewInputs {
            stream: vec![record("a", 1), record("b", 0), record("c", 1), record("d", 1)],
            health: Some(health(true)),
            drift: Some(DriftResponse {
                drift_detected: false,
                drift_score: 0.11,
                feature_shifts: Some(shifts),
            }),
            drift_log: Some(vec![DriftLogEntry::default(), DriftLogEntry::default()]),
            ..ViewInputs::default()
        };
        let view = reconcile(&inputs);
        assert_eq!(view.positive_rate, Some(0.75));
        assert_eq!(view.drift_checks, 2);
        assert_eq!(view.drift_score, 0.11);
        assert_eq!(view.feature_shifts[0].0, "glucose");
        assert_eq!(view.model_type.as_deref(), Some("RandomForestClassifier"));
    }

    #[test]
    fn default_view_is_disconnected_error() {
        let view = ReconciledView::default();
        assert_eq!(view.model_status, ModelStatus::Error);
        assert_eq!(view.connection, ConnectionIndicator::Disconnected);
        assert_eq!(view.drift_score, 0.0);
    }
}
