//! In-memory state for the driftwatch client: the bounded buffer of streamed predictions
//! and the pure reconciliation that turns buffer + poll snapshots into one read model.

pub mod buffer;
pub mod view;

pub use buffer::{BoundedRing, EventBuffer, DEFAULT_CAPACITY};
pub use view::{
    model_status, prediction_series, reconcile, PredictionSource, ReconciledView, SeriesFlags,
    ViewInputs,
};
