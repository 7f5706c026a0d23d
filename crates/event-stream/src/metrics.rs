use std::sync::atomic::{AtomicU64, Ordering};

use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounter, IntCounterVec, Opts, Registry};
use tracing::error;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamMetricsSnapshot {
    pub opened: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub disconnects: u64,
    pub reconnects: u64,
}

static OPENED: AtomicU64 = AtomicU64::new(0);
static ACCEPTED: AtomicU64 = AtomicU64::new(0);
static REJECTED: AtomicU64 = AtomicU64::new(0);
static DISCONNECTS: AtomicU64 = AtomicU64::new(0);
static RECONNECTS: AtomicU64 = AtomicU64::new(0);

lazy_static! {
    static ref STREAM_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "driftwatch_stream_events_total",
            "Stream payloads received, by decode outcome"
        ),
        &["outcome"]
    )
    .unwrap();
    static ref STREAM_OPENED_TOTAL: IntCounter = IntCounter::new(
        "driftwatch_stream_opened_total",
        "Event stream subscriptions opened"
    )
    .unwrap();
    static ref STREAM_DISCONNECTS_TOTAL: IntCounter = IntCounter::new(
        "driftwatch_stream_disconnects_total",
        "Event stream subscriptions lost"
    )
    .unwrap();
    static ref STREAM_RECONNECTS_TOTAL: IntCounter = IntCounter::new(
        "driftwatch_stream_reconnects_total",
        "Reconnect attempts after the fixed delay"
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(target: "driftwatch::stream", ?err, "failed to register stream metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, STREAM_EVENTS_TOTAL.clone());
    register(registry, STREAM_OPENED_TOTAL.clone());
    register(registry, STREAM_DISCONNECTS_TOTAL.clone());
    register(registry, STREAM_RECONNECTS_TOTAL.clone());
}

pub fn record_opened() {
    OPENED.fetch_add(1, Ordering::Relaxed);
    STREAM_OPENED_TOTAL.inc();
}

pub fn record_accepted() {
    ACCEPTED.fetch_add(1, Ordering::Relaxed);
    STREAM_EVENTS_TOTAL.with_label_values(&["accepted"]).inc();
}

pub fn record_rejected() {
    REJECTED.fetch_add(1, Ordering::Relaxed);
    STREAM_EVENTS_TOTAL.with_label_values(&["rejected"]).inc();
}

pub fn record_disconnect() {
    DISCONNECTS.fetch_add(1, Ordering::Relaxed);
    STREAM_DISCONNECTS_TOTAL.inc();
}

pub fn record_reconnect() {
    RECONNECTS.fetch_add(1, Ordering::Relaxed);
    STREAM_RECONNECTS_TOTAL.inc();
}

pub fn snapshot() -> StreamMetricsSnapshot {
    StreamMetricsSnapshot {
        opened: OPENED.load(Ordering::Relaxed),
        accepted: ACCEPTED.load(Ordering::Relaxed),
        rejected: REJECTED.load(Ordering::Relaxed),
        disconnects: DISCONNECTS.load(Ordering::Relaxed),
        reconnects: RECONNECTS.load(Ordering::Relaxed),
    }
}
