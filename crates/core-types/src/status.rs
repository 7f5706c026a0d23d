use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle of the live event subscription.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    /// The previous subscription failed and a reconnect is scheduled.
    Reconnecting,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the presentation layer shows next to the live feed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionIndicator {
    Live,
    Disconnected,
}

impl From<ConnectionState> for ConnectionIndicator {
    fn from(state: ConnectionState) -> Self {
        if state.is_open() {
            ConnectionIndicator::Live
        } else {
            ConnectionIndicator::Disconnected
        }
    }
}

impl fmt::Display for ConnectionIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionIndicator::Live => f.write_str("live"),
            ConnectionIndicator::Disconnected => f.write_str("disconnected"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Healthy,
    Drift,
    Error,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStatus::Healthy => f.write_str("healthy"),
            ModelStatus::Drift => f.write_str("drift"),
            ModelStatus::Error => f.write_str("error"),
        }
    }
}

/// Logical series refreshed by polling.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesKey {
    Health,
    Drift,
    DriftLog,
    TrainingLog,
    RecentPredictions,
}

impl SeriesKey {
    pub const ALL: [SeriesKey; 5] = [
        SeriesKey::Health,
        SeriesKey::Drift,
        SeriesKey::DriftLog,
        SeriesKey::TrainingLog,
        SeriesKey::RecentPredictions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SeriesKey::Health => "health",
            SeriesKey::Drift => "drift",
            SeriesKey::DriftLog => "driftLog",
            SeriesKey::TrainingLog => "trainingLog",
            SeriesKey::RecentPredictions => "recentPredictions",
        }
    }

    pub fn default_interval(self) -> Duration {
        let ms = match self {
            SeriesKey::Health => 30_000,
            SeriesKey::Drift => 10_000,
            SeriesKey::DriftLog => 30_000,
            SeriesKey::TrainingLog => 10_000,
            SeriesKey::RecentPredictions => 5_000,
        };
        Duration::from_millis(ms)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
