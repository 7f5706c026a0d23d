use std::sync::atomic::{AtomicU64, Ordering};

use lazy_static::lazy_static;
use once_cell::sync::Lazy;
use prometheus::{core::Collector, IntCounterVec, Opts, Registry};
use tracing::error;

#[derive(Default)]
struct Counters {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    skipped: AtomicU64,
    discarded: AtomicU64,
}

static COUNTERS: Lazy<Counters> = Lazy::new(Counters::default);

lazy_static! {
    static ref POLL_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("driftwatch_poll_fetches_total", "Completed poll cycles by outcome"),
        &["series", "outcome"]
    )
    .unwrap();
    static ref POLL_RETRIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("driftwatch_poll_retries_total", "Silent retries after a failed fetch"),
        &["series"]
    )
    .unwrap();
    static ref POLL_SKIPPED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "driftwatch_poll_skipped_total",
            "Ticks skipped because a fetch was still in flight"
        ),
        &["series"]
    )
    .unwrap();
}

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(target: "driftwatch::poll", ?err, "failed to register poll metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, POLL_FETCHES_TOTAL.clone());
    register(registry, POLL_RETRIES_TOTAL.clone());
    register(registry, POLL_SKIPPED_TOTAL.clone());
}

pub fn record_started(_series: &str) {
    increment(&COUNTERS.started);
}

pub fn record_succeeded(series: &str) {
    increment(&COUNTERS.succeeded);
    POLL_FETCHES_TOTAL.with_label_values(&[series, "ok"]).inc();
}

pub fn record_failed(series: &str) {
    increment(&COUNTERS.failed);
    POLL_FETCHES_TOTAL.with_label_values(&[series, "error"]).inc();
}

pub fn record_retry(series: &str) {
    increment(&COUNTERS.retried);
    POLL_RETRIES_TOTAL.with_label_values(&[series]).inc();
}

pub fn record_skipped(series: &str) {
    increment(&COUNTERS.skipped);
    POLL_SKIPPED_TOTAL.with_label_values(&[series]).inc();
}

pub fn record_discarded(_series: &str) {
    increment(&COUNTERS.discarded);
}

#[derive(Clone, Debug, Default)]
pub struct SchedulerMetricsSnapshot {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub retried: u64,
    pub skipped: u64,
    pub discarded: u64,
}

pub fn snapshot() -> SchedulerMetricsSnapshot {
    SchedulerMetricsSnapshot {
        started: COUNTERS.started.load(Ordering::Relaxed),
        succeeded: COUNTERS.succeeded.load(Ordering::Relaxed),
        failed: COUNTERS.failed.load(Ordering::Relaxed),
        retried: COUNTERS.retried.load(Ordering::Relaxed),
        skipped: COUNTERS.skipped.load(Ordering::Relaxed),
        discarded: COUNTERS.discarded.load(Ordering::Relaxed),
    }
}
