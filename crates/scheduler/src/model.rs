use std::time::Duration;

use driftwatch_core_types::SeriesKey;
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Silent retries applied to a failed fetch before the error is surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOpt {
    pub max: u32,
    /// Pause between attempts; zero retries immediately.
    pub backoff_ms: u64,
}

impl RetryOpt {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryOpt {
    fn default() -> Self {
        Self {
            max: 2,
            backoff_ms: 0,
        }
    }
}

/// Per-series overrides. Unset fields fall back to the series defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesOverride {
    pub interval_ms: Option<u64>,
    pub retry: Option<RetryOpt>,
    pub stale_after_ms: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub retry: RetryOpt,
    pub health: SeriesOverride,
    pub drift: SeriesOverride,
    pub drift_log: SeriesOverride,
    pub training_log: SeriesOverride,
    pub recent_predictions: SeriesOverride,
}

impl SchedulerConfig {
    pub fn series(&self, key: SeriesKey) -> &SeriesOverride {
        match key {
            SeriesKey::Health => &self.health,
            SeriesKey::Drift => &self.drift,
            SeriesKey::DriftLog => &self.drift_log,
            SeriesKey::TrainingLog => &self.training_log,
            SeriesKey::RecentPredictions => &self.recent_predictions,
        }
    }

    pub fn series_mut(&mut self, key: SeriesKey) -> &mut SeriesOverride {
        match key {
            SeriesKey::Health => &mut self.health,
            SeriesKey::Drift => &mut self.drift,
            SeriesKey::DriftLog => &mut self.drift_log,
            SeriesKey::TrainingLog => &mut self.training_log,
            SeriesKey::RecentPredictions => &mut self.recent_predictions,
        }
    }

    /// Effective schedule for one series.
    pub fn spec(&self, key: SeriesKey) -> PollSpec {
        let series = self.series(key);
        let interval = series
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| key.default_interval());
        PollSpec {
            key,
            interval,
            retry: series.retry.unwrap_or(self.retry),
            stale_after: series
                .stale_after_ms
                .map(Duration::from_millis)
                .unwrap_or(interval),
        }
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        for key in SeriesKey::ALL {
            let spec = self.spec(key);
            if spec.interval.is_zero() {
                return Err(SchedulerError::ZeroInterval(key));
            }
            if spec.stale_after.is_zero() {
                return Err(SchedulerError::ZeroStaleWindow(key));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSpec {
    pub key: SeriesKey,
    pub interval: Duration,
    pub retry: RetryOpt,
    /// A value older than this reads as stale.
    pub stale_after: Duration,
}

impl PollSpec {
    pub fn new(key: SeriesKey, interval: Duration) -> Self {
        Self {
            key,
            interval,
            retry: RetryOpt::default(),
            stale_after: interval,
        }
    }

    pub fn with_retry(mut self, retry: RetryOpt) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }
}
