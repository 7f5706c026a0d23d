//! Error type for the monitor context and its configuration.

use std::path::PathBuf;

use driftwatch_scheduler::SchedulerError;
use driftwatch_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid backend url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("monitor is stopped")]
    Stopped,
}

impl MonitorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
