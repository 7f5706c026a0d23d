use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use driftwatch_core_types::SeriesKey;
use driftwatch_state_center::SeriesFlags;
use driftwatch_transport::TransportError;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::metrics;
use crate::model::PollSpec;
use crate::state::PollState;

pub type FetchFuture<T> = BoxFuture<'static, Result<T, TransportError>>;
pub type FetchFn<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync>;

/// Cancellation scope and change feed shared by the tasks of one scheduler.
#[derive(Clone)]
pub struct TaskContext {
    pub shutdown: CancellationToken,
    pub updates: broadcast::Sender<SeriesKey>,
}

impl Default for TaskContext {
    fn default() -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            shutdown: CancellationToken::new(),
            updates,
        }
    }
}

/// Type-erased control surface over a [`PollTask`].
#[async_trait]
pub trait PollHandle: Send + Sync {
    fn key(&self) -> SeriesKey;
    fn spec(&self) -> &PollSpec;
    fn start(&self);
    /// Fetch now unless a fetch is already in flight. Returns whether one was started.
    fn refetch(&self) -> bool;
    /// Like `refetch`, but a fetch already in flight is followed by exactly one more,
    /// so the series always reflects state written before this call.
    fn invalidate(&self) -> bool;
    fn is_in_flight(&self) -> bool;
    fn flags(&self) -> SeriesFlags;
    async fn stop(&self);
}

struct Shared<T> {
    spec: PollSpec,
    fetch: FetchFn<T>,
    state: watch::Sender<PollState<T>>,
    in_flight: AtomicBool,
    /// Set when an invalidation lands mid-fetch; consumed by whoever clears `in_flight`.
    pending: AtomicBool,
    shutdown: CancellationToken,
    updates: broadcast::Sender<SeriesKey>,
}

/// One periodically refreshed series.
///
/// The first fetch fires on `start`, then one per interval at a fixed rate. A tick that
/// lands while a fetch is still running is dropped, so at most one fetch per task is ever
/// in flight.
pub struct PollTask<T> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T> PollTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(spec: PollSpec, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        Self::with_context(spec, fetch, &TaskContext::default())
    }

    pub fn with_context<F, Fut>(spec: PollSpec, fetch: F, context: &TaskContext) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || fetch().boxed());
        let (state, _) = watch::channel(PollState::default());
        Self {
            shared: Arc::new(Shared {
                spec,
                fetch,
                state,
                in_flight: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                shutdown: context.shutdown.child_token(),
                updates: context.updates.clone(),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn watch(&self) -> watch::Receiver<PollState<T>> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> PollState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn value(&self) -> Option<T> {
        self.shared.state.borrow().value.clone()
    }
}

#[async_trait]
impl<T> PollHandle for PollTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn key(&self) -> SeriesKey {
        self.shared.spec.key
    }

    fn spec(&self) -> &PollSpec {
        &self.shared.spec
    }

    fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() || self.shared.shutdown.is_cancelled() {
            return;
        }
        debug!(
            target: "driftwatch::poll",
            series = %self.shared.spec.key,
            interval_ms = self.shared.spec.interval.as_millis() as u64,
            "poll task started"
        );
        *worker = Some(tokio::spawn(Shared::run(Arc::clone(&self.shared))));
    }

    fn refetch(&self) -> bool {
        Shared::trigger(&self.shared, "refetch")
    }

    fn invalidate(&self) -> bool {
        Shared::invalidate(&self.shared)
    }

    fn is_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    fn flags(&self) -> SeriesFlags {
        self.shared.state.borrow().flags(self.shared.spec.stale_after)
    }

    async fn stop(&self) {
        self.shared.shutdown.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(target: "driftwatch::poll", series = %self.shared.spec.key, %err, "poll task did not exit cleanly");
            }
        }
    }
}

impl<T> Drop for PollTask<T> {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(shared: Arc<Self>) {
        let mut ticker = interval(shared.spec.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shared.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    Self::trigger(&shared, "tick");
                }
            }
        }
        debug!(target: "driftwatch::poll", series = %shared.spec.key, "poll task stopped");
    }

    fn trigger(shared: &Arc<Self>, cause: &'static str) -> bool {
        if shared.shutdown.is_cancelled() {
            return false;
        }
        if Self::begin(shared) {
            return true;
        }
        metrics::record_skipped(shared.spec.key.as_str());
        debug!(target: "driftwatch::poll", series = shared.spec.key.as_str(), cause, "fetch in flight; skipped");
        false
    }

    fn invalidate(shared: &Arc<Self>) -> bool {
        if shared.shutdown.is_cancelled() {
            return false;
        }
        if Self::begin(shared) {
            return true;
        }
        shared.pending.store(true, Ordering::SeqCst);
        debug!(target: "driftwatch::poll", series = shared.spec.key.as_str(), "fetch in flight; follow-up queued");
        // The running cycle may have finished between `begin` and the store above.
        if !shared.in_flight.load(Ordering::SeqCst) && shared.pending.swap(false, Ordering::SeqCst) {
            Self::begin(shared);
        }
        true
    }

    /// Claim the in-flight slot and spawn one fetch cycle.
    fn begin(shared: &Arc<Self>) -> bool {
        if shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        metrics::record_started(shared.spec.key.as_str());
        shared.publish(|state| state.in_flight = true);
        let cycle = Arc::clone(shared);
        tokio::spawn(async move { cycle.cycle().await });
        true
    }

    async fn cycle(self: Arc<Self>) {
        let series = self.spec.key.as_str();
        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => None,
            outcome = self.fetch_with_retry() => Some(outcome),
        };
        let outcome = match outcome {
            Some(outcome) if !self.shutdown.is_cancelled() => outcome,
            _ => {
                metrics::record_discarded(series);
                self.release_stopped();
                return;
            }
        };

        let published = match outcome {
            Ok(value) => {
                metrics::record_succeeded(series);
                self.publish(|state| {
                    state.value = Some(value);
                    state.error = None;
                    state.updated_at = Some(Instant::now());
                    state.consecutive_failures = 0;
                    state.fetch_count += 1;
                    state.in_flight = false;
                    self.in_flight.store(false, Ordering::SeqCst);
                })
            }
            Err(err) => {
                metrics::record_failed(series);
                warn!(
                    target: "driftwatch::poll",
                    series,
                    status = ?err.status,
                    %err,
                    "fetch failed after retries"
                );
                self.publish(|state| {
                    state.error = Some(err);
                    state.consecutive_failures += 1;
                    state.fetch_count += 1;
                    state.in_flight = false;
                    self.in_flight.store(false, Ordering::SeqCst);
                })
            }
        };
        if !published {
            self.release_stopped();
            return;
        }
        if self.pending.swap(false, Ordering::SeqCst) {
            debug!(target: "driftwatch::poll", series, "running queued follow-up fetch");
            Self::begin(&self);
        }
    }

    /// Stopped mid-fetch: free the slot and drop the in-flight marker, leaving the last
    /// value and error untouched. Nothing goes out on the update feed.
    fn release_stopped(&self) {
        self.pending.store(false, Ordering::Release);
        self.state.send_if_modified(|state| std::mem::replace(&mut state.in_flight, false));
        self.in_flight.store(false, Ordering::Release);
    }

    async fn fetch_with_retry(&self) -> Result<T, TransportError> {
        let retry = self.spec.retry;
        let mut attempt = 0u32;
        loop {
            match (self.fetch)().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < retry.max => {
                    attempt += 1;
                    metrics::record_retry(self.spec.key.as_str());
                    debug!(
                        target: "driftwatch::poll",
                        series = self.spec.key.as_str(),
                        attempt,
                        %err,
                        "fetch failed; retrying"
                    );
                    if !retry.backoff().is_zero() {
                        sleep(retry.backoff()).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Apply a state change and announce it. Dropped once the task is stopped.
    fn publish(&self, apply: impl FnOnce(&mut PollState<T>)) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        self.state.send_modify(apply);
        let _ = self.updates.send(self.spec.key);
        true
    }
}
