use driftwatch_core_types::SeriesKey;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("poll interval for {0} must be non-zero")]
    ZeroInterval(SeriesKey),
    #[error("stale window for {0} must be non-zero")]
    ZeroStaleWindow(SeriesKey),
}
