use clap::Subcommand;

use super::logs::RecentArgs;
use super::predict::PredictArgs;
use super::watch::WatchArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Follow the live feed and polled series, printing the view on every change
    Watch(WatchArgs),

    /// One-shot health and drift check with the derived model status
    Status,

    /// Submit one prediction request
    Predict(PredictArgs),

    /// Trigger retraining and show the training log
    Train,

    /// Show historical drift checks
    DriftLog,

    /// Show historical training triggers
    TrainingLog,

    /// Show recently logged predictions
    Recent(RecentArgs),

    /// Print the drift report location
    ReportUrl,

    /// Show version, build and effective configuration
    Info,
}
