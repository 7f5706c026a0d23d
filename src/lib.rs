//! driftwatch: live monitoring client for an ML prediction service.
//!
//! The [`Monitor`] ties together the reconnecting event feed, the polling scheduler and
//! the reconciled read model. The `driftwatch` binary wraps it in a small CLI.

pub mod app_context;
pub mod cli;
pub mod config;
pub mod errors;
pub mod metrics;

pub use app_context::Monitor;
pub use config::MonitorConfig;
pub use errors::{MonitorError, MonitorResult};

pub use driftwatch_core_types as types;
pub use driftwatch_state_center::{ReconciledView, ViewInputs};
