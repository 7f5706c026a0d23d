use driftwatch_core_types::{ConnectionState, PredictionRecord};
use serde::Serialize;

/// Transient text shown while a reconnect is pending.
pub const RECONNECT_NOTICE: &str = "Connection lost. Reconnecting...";

/// Pushed to every notice subscriber, in the order things happened.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamNotice {
    Opened,
    /// A decoded event that has already been written to the buffer.
    Event(PredictionRecord),
    Disconnected { reason: String },
}

/// Current state of the connector, published on a `watch` channel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub state: ConnectionState,
    /// Cause of the most recent failure; cleared on the next successful open.
    pub last_error: Option<String>,
    /// User-facing notice while reconnecting.
    pub notice: Option<String>,
    /// Events decoded and buffered since start.
    pub received: u64,
    /// Payloads that failed to decode.
    pub rejected: u64,
    pub reconnects: u64,
}

impl StreamStatus {
    pub fn is_live(&self) -> bool {
        self.state.is_open()
    }
}
