use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use driftwatch_core_types::{PredictionInput, SeriesKey};
use driftwatch_scheduler::{PollingScheduler, SchedulerConfig};
use driftwatch_transport::{Method, MonitorApi, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use url::Url;

/// Answers from a mutable route table and counts hits per path. A delayed route
/// reads its answer when the request arrives and replies after the delay.
struct FakeService {
    base: Url,
    routes: Mutex<HashMap<String, Result<Value, TransportError>>>,
    delays: Mutex<HashMap<String, Duration>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl FakeService {
    fn new() -> Arc<Self> {
        let service = Arc::new(Self {
            base: Url::parse("http://localhost:8000").unwrap(),
            routes: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            hits: Mutex::new(HashMap::new()),
        });
        service.route("/health", Ok(json!({"status": "ok", "model_loaded": true, "model_type": "RandomForestClassifier"})));
        service.route("/drift", Ok(json!({"drift_detected": false, "drift_score": 0.02})));
        service.route("/drift_log", Ok(json!([])));
        service.route("/training_log", Ok(json!([])));
        service.route("/recent", Ok(json!([])));
        service
    }

    fn route(&self, path: &str, response: Result<Value, TransportError>) {
        self.routes.lock().insert(path.to_string(), response);
    }

    fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().insert(path.to_string(), delay);
    }

    fn hits(&self, path: &str) -> usize {
        self.hits.lock().get(path).copied().unwrap_or(0)
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
        *self.hits.lock().entry(path.to_string()).or_default() += 1;
        let response = self
            .routes
            .lock()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::http_status(404, "not found")));
        let delay = self.delays.lock().get(path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }

    fn base_url(&self) -> &Url {
        &self.base
    }
}

fn scheduler(service: &Arc<FakeService>) -> PollingScheduler {
    let api = MonitorApi::new(service.clone());
    PollingScheduler::new(api, SchedulerConfig::default()).expect("valid config")
}

async fn settle() {
    for _ in 0..40 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn every_series_fetches_on_start_then_on_its_own_cadence() {
    let service = FakeService::new();
    let scheduler = scheduler(&service);
    scheduler.start();
    settle().await;

    for path in ["/health", "/drift", "/drift_log", "/training_log", "/recent"] {
        assert_eq!(service.hits(path), 1, "{path}");
    }

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(service.hits("/recent"), 2);
    assert_eq!(service.hits("/drift"), 1);

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(service.hits("/recent"), 3);
    assert_eq!(service.hits("/drift"), 2);
    assert_eq!(service.hits("/training_log"), 2);
    assert_eq!(service.hits("/health"), 1);

    tokio::time::advance(Duration::from_secs(20)).await;
    settle().await;
    assert_eq!(service.hits("/health"), 2);
    assert_eq!(service.hits("/drift_log"), 2);
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn recent_error_payload_is_an_empty_snapshot() {
    let service = FakeService::new();
    service.route("/recent", Ok(json!({"error": "no recent predictions"})));
    service.route("/drift_log", Ok(json!({"detail": "not a list"})));
    let scheduler = scheduler(&service);
    scheduler.start();
    settle().await;

    let recent = scheduler.recent().state();
    assert_eq!(recent.value, Some(Vec::new()));
    assert!(recent.error.is_none());
    assert_eq!(scheduler.drift_log().value(), Some(Vec::new()));
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failing_series_reports_error_after_three_attempts() {
    let service = FakeService::new();
    service.route("/drift", Err(TransportError::http_status(500, "Internal Server Error")));
    let scheduler = scheduler(&service);
    scheduler.start();
    settle().await;

    assert_eq!(service.hits("/drift"), 3);
    let flags = scheduler.flags();
    assert_eq!(
        flags[&SeriesKey::Drift].error.as_deref(),
        Some("Internal Server Error")
    );
    assert!(!flags[&SeriesKey::Drift].loading);
    assert!(flags[&SeriesKey::Health].error.is_none());
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn mutations_invalidate_dependent_series() {
    let service = FakeService::new();
    service.route("/train", Ok(json!({"status": "Training started"})));
    service.route("/predict", Ok(json!({"prediction": 0})));
    let scheduler = scheduler(&service);
    scheduler.start();
    settle().await;

    service.route(
        "/training_log",
        Ok(json!([{"timestamp": "2024-05-01T10:00:00", "action": "Training triggered"}])),
    );
    let response = scheduler.train().await.expect("train");
    assert_eq!(response.status, "Training started");
    settle().await;
    assert_eq!(service.hits("/training_log"), 2);
    assert_eq!(scheduler.training_log().value().map(|log| log.len()), Some(1));

    let prediction = scheduler
        .predict(&PredictionInput::default())
        .await
        .expect("predict");
    assert_eq!(prediction.prediction, 0);
    settle().await;
    assert_eq!(service.hits("/recent"), 2);
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn train_during_slow_log_fetch_is_followed_by_fresh_fetch() {
    let service = FakeService::new();
    service.route("/train", Ok(json!({"status": "Training started"})));
    service.delay("/training_log", Duration::from_secs(2));
    let scheduler = scheduler(&service);
    scheduler.start();
    settle().await;
    assert!(scheduler.training_log().state().in_flight);
    assert_eq!(service.hits("/training_log"), 1);

    service.route(
        "/training_log",
        Ok(json!([{"timestamp": "2024-05-01T10:00:00", "action": "Training triggered"}])),
    );
    scheduler.train().await.expect("train");
    settle().await;
    assert_eq!(service.hits("/training_log"), 1);

    // The first fetch answers with the log it read before training.
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(service.hits("/training_log"), 2);
    assert!(scheduler.training_log().state().in_flight);

    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    let state = scheduler.training_log().state();
    assert_eq!(state.value.map(|log| log.len()), Some(1));
    assert!(!state.in_flight);
    assert_eq!(state.fetch_count, 2);

    // One follow-up only; the next fetch is the regular tick at 10 s.
    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(service.hits("/training_log"), 2);
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_silences_every_timer() {
    let service = FakeService::new();
    let scheduler = scheduler(&service);
    let mut updates = scheduler.subscribe();
    scheduler.start();
    settle().await;
    assert!(updates.try_recv().is_ok());

    scheduler.stop().await;
    tokio::time::advance(Duration::from_secs(120)).await;
    settle().await;
    for path in ["/health", "/drift", "/drift_log", "/training_log", "/recent"] {
        assert_eq!(service.hits(path), 1, "{path}");
    }
    assert!(!scheduler.refetch(SeriesKey::Drift));
}
