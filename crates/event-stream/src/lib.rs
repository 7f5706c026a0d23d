//! Live prediction feed.
//!
//! [`EventStreamConnector`] keeps exactly one subscription to a [`MessageSource`] open,
//! decodes every message into a [`PredictionRecord`](driftwatch_core_types::PredictionRecord)
//! and pushes it into the shared [`EventBuffer`](driftwatch_state_center::EventBuffer).
//! A failed or ended subscription is closed and reopened after a fixed delay, forever,
//! until [`EventStreamConnector::stop`] is called.
//!
//! [`MessageSource`]: driftwatch_transport::MessageSource

pub mod config;
pub mod connector;
pub mod metrics;
pub mod notice;
pub mod scripted;

pub use config::StreamConfig;
pub use connector::EventStreamConnector;
pub use notice::{StreamNotice, StreamStatus, RECONNECT_NOTICE};
pub use scripted::{ScriptStep, ScriptedSource};
