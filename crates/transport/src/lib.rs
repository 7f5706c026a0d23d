//! Transport layer for the driftwatch client.
//!
//! [`HttpTransport`] issues plain request/response calls against the prediction service,
//! [`MonitorApi`] wraps those calls in typed endpoint helpers, and [`SseSource`] opens the
//! long-lived `/events` subscription. Nothing in this crate retries; retry policy belongs to
//! the callers.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod source;
pub mod sse;

pub use api::MonitorApi;
pub use client::{endpoint_url, HttpTransport, Transport, EVENTS_PATH};
pub use config::TransportConfig;
pub use error::{StreamError, TransportError, TransportErrorKind};
pub use reqwest::Method;
pub use source::{MessageSource, SseSource, Subscription};
pub use sse::{SseDecoder, SseMessage, MAX_FRAME_BYTES};
