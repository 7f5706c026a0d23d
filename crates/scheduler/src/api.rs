use std::collections::BTreeMap;

use driftwatch_core_types::{
    DriftLogEntry, DriftResponse, HealthResponse, PredictionInput, PredictionRecord,
    PredictionResponse, SeriesKey, TrainingLogEntry, TrainingResponse,
};
use driftwatch_state_center::SeriesFlags;
use driftwatch_transport::{MonitorApi, TransportError};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::SchedulerError;
use crate::model::SchedulerConfig;
use crate::task::{PollHandle, PollTask, TaskContext};

/// The five dashboard series, each on its own timer.
pub struct PollingScheduler {
    api: MonitorApi,
    config: SchedulerConfig,
    context: TaskContext,
    health: PollTask<HealthResponse>,
    drift: PollTask<DriftResponse>,
    drift_log: PollTask<Vec<DriftLogEntry>>,
    training_log: PollTask<Vec<TrainingLogEntry>>,
    recent: PollTask<Vec<PredictionRecord>>,
}

macro_rules! poll_task {
    ($api:expr, $config:expr, $context:expr, $key:expr, $method:ident) => {{
        let api = $api.clone();
        PollTask::with_context(
            $config.spec($key),
            move || {
                let api = api.clone();
                async move { api.$method().await }
            },
            $context,
        )
    }};
}

impl PollingScheduler {
    pub fn new(api: MonitorApi, config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        let context = TaskContext::default();
        Ok(Self {
            health: poll_task!(api, config, &context, SeriesKey::Health, health),
            drift: poll_task!(api, config, &context, SeriesKey::Drift, drift),
            drift_log: poll_task!(api, config, &context, SeriesKey::DriftLog, drift_log),
            training_log: poll_task!(api, config, &context, SeriesKey::TrainingLog, training_log),
            recent: poll_task!(api, config, &context, SeriesKey::RecentPredictions, recent),
            api,
            config,
            context,
        })
    }

    pub fn api(&self) -> &MonitorApi {
        &self.api
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Key of every series whose state changed, in the order the changes were applied.
    pub fn subscribe(&self) -> broadcast::Receiver<SeriesKey> {
        self.context.updates.subscribe()
    }

    pub fn health(&self) -> &PollTask<HealthResponse> {
        &self.health
    }

    pub fn drift(&self) -> &PollTask<DriftResponse> {
        &self.drift
    }

    pub fn drift_log(&self) -> &PollTask<Vec<DriftLogEntry>> {
        &self.drift_log
    }

    pub fn training_log(&self) -> &PollTask<Vec<TrainingLogEntry>> {
        &self.training_log
    }

    pub fn recent(&self) -> &PollTask<Vec<PredictionRecord>> {
        &self.recent
    }

    pub fn handle(&self, key: SeriesKey) -> &dyn PollHandle {
        match key {
            SeriesKey::Health => &self.health,
            SeriesKey::Drift => &self.drift,
            SeriesKey::DriftLog => &self.drift_log,
            SeriesKey::TrainingLog => &self.training_log,
            SeriesKey::RecentPredictions => &self.recent,
        }
    }

    pub fn start(&self) {
        for key in SeriesKey::ALL {
            self.handle(key).start();
        }
        info!(target: "driftwatch::poll", "polling started");
    }

    /// Cancel every timer. Results of fetches still in flight are dropped.
    pub async fn stop(&self) {
        self.context.shutdown.cancel();
        for key in SeriesKey::ALL {
            self.handle(key).stop().await;
        }
        info!(target: "driftwatch::poll", "polling stopped");
    }

    pub fn refetch(&self, key: SeriesKey) -> bool {
        let started = self.handle(key).refetch();
        debug!(target: "driftwatch::poll", series = %key, started, "refetch requested");
        started
    }

    /// Refresh `key` after a write. A fetch already in flight may have read the old
    /// state, so it is followed by one more instead of being treated as current.
    pub fn invalidate(&self, key: SeriesKey) -> bool {
        let accepted = self.handle(key).invalidate();
        debug!(target: "driftwatch::poll", series = %key, accepted, "series invalidated");
        accepted
    }

    pub fn flags(&self) -> BTreeMap<SeriesKey, SeriesFlags> {
        SeriesKey::ALL
            .into_iter()
            .map(|key| (key, self.handle(key).flags()))
            .collect()
    }

    /// Submit a prediction, then refresh the recent-predictions snapshot.
    pub async fn predict(
        &self,
        input: &PredictionInput,
    ) -> Result<PredictionResponse, TransportError> {
        let response = self.api.predict(input).await?;
        self.invalidate(SeriesKey::RecentPredictions);
        Ok(response)
    }

    /// Trigger retraining, then refresh the training log.
    pub async fn train(&self) -> Result<TrainingResponse, TransportError> {
        let response = self.api.train().await?;
        self.invalidate(SeriesKey::TrainingLog);
        Ok(response)
    }
}
