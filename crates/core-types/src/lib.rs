//! Shared records and primitives for the driftwatch crates.
//!
//! Everything here mirrors the wire shapes served by the prediction service, plus the
//! small enums the stream connector, poll scheduler and view model agree on.

pub mod records;
pub mod status;

pub use records::{
    DriftLogEntry, DriftResponse, HealthResponse, PredictionInput, PredictionRecord,
    PredictionResponse, RecordError, TrainingLogEntry, TrainingResponse,
};
pub use status::{ConnectionIndicator, ConnectionState, ModelStatus, SeriesKey};
