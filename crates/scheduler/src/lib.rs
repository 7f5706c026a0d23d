//! Polling side of the driftwatch client.
//!
//! Every series is a [`PollTask`] with its own interval, retry budget and staleness
//! window. Tasks share nothing but a cancellation scope and a change feed; the
//! [`PollingScheduler`] wires the five dashboard series to [`MonitorApi`] calls.
//!
//! [`MonitorApi`]: driftwatch_transport::MonitorApi

pub mod api;
pub mod error;
pub mod metrics;
pub mod model;
pub mod state;
pub mod task;

pub use api::PollingScheduler;
pub use error::SchedulerError;
pub use model::{PollSpec, RetryOpt, SchedulerConfig, SeriesOverride};
pub use state::PollState;
pub use task::{PollHandle, PollTask, TaskContext};
