use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use driftwatch::types::{ConnectionIndicator, ModelStatus, SeriesKey};
use driftwatch::{Monitor, MonitorConfig, MonitorError};
use driftwatch_event_stream::{ScriptStep, ScriptedSource, RECONNECT_NOTICE};
use driftwatch_state_center::PredictionSource;
use driftwatch_transport::{Method, StreamError, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use url::Url;

struct FakeService {
    base: Url,
    routes: Mutex<HashMap<String, Value>>,
}

impl FakeService {
    fn new() -> Arc<Self> {
        let service = Arc::new(Self {
            base: Url::parse("http://localhost:8000").unwrap(),
            routes: Mutex::new(HashMap::new()),
        });
        service.route(
            "/health",
            json!({"status": "ok", "model_loaded": true, "model_type": "RandomForestClassifier"}),
        );
        service.route(
            "/drift",
            json!({"drift_detected": false, "drift_score": 0.03, "feature_shifts": {"glucose": 0.03}}),
        );
        service.route("/drift_log", json!([]));
        service.route("/training_log", json!([]));
        service.route("/recent", json!([record("snap-2", 1), record("snap-1", 0)]));
        service
    }

    fn route(&self, path: &str, body: Value) {
        self.routes.lock().insert(path.to_string(), body);
    }
}

#[async_trait]
impl Transport for FakeService {
    async fn request(
        &self,
        _method: Method,
        path: &str,
        _body: Option<Value>,
    ) -> Result<Value, TransportError> {
        self.routes
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::http_status(404, "not found"))
    }

    fn base_url(&self) -> &Url {
        &self.base
    }
}

fn record(ts: &str, prediction: u8) -> Value {
    json!({
        "age": 58, "gender": 0, "pulse_rate": 76, "systolic_bp": 135,
        "diastolic_bp": 88, "glucose": 6.9, "height": 1.62, "weight": 74,
        "bmi": 28.2, "family_diabetes": 1, "hypertensive": 0,
        "family_hypertension": 1, "cardiovascular_disease": 0, "stroke": 0,
        "prediction": prediction, "timestamp": ts
    })
}

async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

fn monitor(service: &Arc<FakeService>, source: &ScriptedSource) -> Arc<Monitor> {
    Monitor::with_parts(
        MonitorConfig::default(),
        service.clone(),
        Arc::new(source.clone()),
    )
    .expect("monitor")
}

#[tokio::test(start_paused = true)]
async fn snapshot_feeds_view_until_stream_delivers() {
    let service = FakeService::new();
    let source = ScriptedSource::new().session(vec![
        ScriptStep::Pause(Duration::from_secs(7)),
        ScriptStep::Message(record("live-1", 1).to_string()),
    ]);
    let monitor = monitor(&service, &source);
    monitor.start();
    settle().await;

    let view = monitor.view();
    assert_eq!(view.prediction_source, PredictionSource::Snapshot);
    assert_eq!(view.predictions.len(), 2);
    assert_eq!(view.predictions[0].timestamp, "snap-2");
    assert_eq!(view.connection, ConnectionIndicator::Live);
    assert_eq!(view.model_status, ModelStatus::Healthy);
    assert_eq!(view.model_type.as_deref(), Some("RandomForestClassifier"));

    tokio::time::advance(Duration::from_secs(7)).await;
    settle().await;

    let view = monitor.view();
    assert_eq!(view.prediction_source, PredictionSource::Stream);
    assert_eq!(view.predictions.len(), 1);
    assert_eq!(
        view.latest_prediction.map(|r| r.timestamp),
        Some("live-1".to_string())
    );
    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn model_status_follows_polled_series() {
    let service = FakeService::new();
    let source = ScriptedSource::new();
    let monitor = monitor(&service, &source);
    monitor.start();
    settle().await;
    assert_eq!(monitor.view().model_status, ModelStatus::Healthy);

    service.route("/drift", json!({"drift": true, "drift_score": 0.41}));
    assert!(monitor.check_drift_now());
    settle().await;
    let view = monitor.view();
    assert_eq!(view.model_status, ModelStatus::Drift);
    assert!(view.drift_detected);
    assert_eq!(view.drift_score, 0.41);

    service.route(
        "/health",
        json!({"status": "ok", "model_loaded": false, "model_type": ""}),
    );
    assert!(monitor.refresh(SeriesKey::Health));
    settle().await;
    let view = monitor.view();
    assert_eq!(view.model_status, ModelStatus::Error);
    assert_eq!(view.model_type, None);
    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn recent_error_and_dead_stream_yield_empty_disconnected_view() {
    let service = FakeService::new();
    service.route("/recent", json!({"error": "no recent predictions"}));
    service.route("/drift_log", json!({"unexpected": "shape"}));
    let source = ScriptedSource::new()
        .refuse(StreamError::Connect("connection refused".into()))
        .refuse(StreamError::Connect("connection refused".into()));
    let monitor = monitor(&service, &source);
    monitor.start();
    settle().await;

    let view = monitor.view();
    assert_eq!(view.prediction_source, PredictionSource::Empty);
    assert!(view.predictions.is_empty());
    assert_eq!(view.drift_checks, 0);
    assert_eq!(view.connection, ConnectionIndicator::Disconnected);
    assert_eq!(view.connection_notice.as_deref(), Some(RECONNECT_NOTICE));
    assert!(view.series[&SeriesKey::RecentPredictions].error.is_none());
    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn polling_errors_surface_per_series() {
    let service = FakeService::new();
    service.routes.lock().remove("/training_log");
    let source = ScriptedSource::new();
    let monitor = monitor(&service, &source);
    monitor.start();
    settle().await;

    let view = monitor.view();
    assert_eq!(
        view.series[&SeriesKey::TrainingLog].error.as_deref(),
        Some("not found")
    );
    assert!(view.training_log.is_empty());
    assert!(view.series[&SeriesKey::Drift].error.is_none());
    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stopped_monitor_rejects_mutations() {
    let service = FakeService::new();
    service.route("/train", json!({"status": "Training started"}));
    let source = ScriptedSource::new();
    let monitor = monitor(&service, &source);
    monitor.start();
    settle().await;

    let response = monitor.train().await.expect("train while running");
    assert_eq!(response.status, "Training started");

    monitor.stop().await;
    assert!(!monitor.is_running());
    assert_eq!(source.live(), 0);
    assert!(matches!(monitor.train().await, Err(MonitorError::Stopped)));
    assert_eq!(
        monitor.drift_report_url().unwrap().as_str(),
        "http://localhost:8000/drift_report"
    );
}
