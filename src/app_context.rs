//! The monitor context: one owner for the event buffer, the stream connector, the polling
//! scheduler and the published read model.

use std::sync::Arc;
use std::time::Duration;

use driftwatch_core_types::{PredictionInput, PredictionResponse, SeriesKey, TrainingResponse};
use driftwatch_event_stream::{EventStreamConnector, StreamNotice, StreamStatus};
use driftwatch_scheduler::PollingScheduler;
use driftwatch_state_center::{reconcile, EventBuffer, ReconciledView, ViewInputs};
use driftwatch_transport::{HttpTransport, MessageSource, MonitorApi, Transport};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::MonitorConfig;
use crate::errors::{MonitorError, MonitorResult};

/// How often staleness flags are re-evaluated when nothing else changes.
const STALE_SWEEP: Duration = Duration::from_secs(1);

pub struct Monitor {
    config: MonitorConfig,
    api: MonitorApi,
    buffer: Arc<EventBuffer>,
    connector: Arc<EventStreamConnector>,
    scheduler: Arc<PollingScheduler>,
    view: watch::Sender<ReconciledView>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Monitor {
    /// Build a monitor talking HTTP and SSE to the configured backend.
    pub fn new(config: MonitorConfig) -> MonitorResult<Arc<Self>> {
        config.validate()?;
        let transport = HttpTransport::new(config.transport.clone())?;
        let source = transport.event_source()?;
        Self::with_parts(config, Arc::new(transport), Arc::new(source))
    }

    /// Build a monitor over caller-supplied transport and push source.
    pub fn with_parts(
        config: MonitorConfig,
        transport: Arc<dyn Transport>,
        source: Arc<dyn MessageSource>,
    ) -> MonitorResult<Arc<Self>> {
        config.validate()?;
        let api = MonitorApi::new(transport);
        let buffer = Arc::new(EventBuffer::new(config.stream.buffer_capacity));
        let connector = EventStreamConnector::new(source, buffer.clone(), config.stream.clone());
        let scheduler = Arc::new(PollingScheduler::new(api.clone(), config.polling.clone())?);
        let (view, _) = watch::channel(ReconciledView::default());
        Ok(Arc::new(Self {
            config,
            api,
            buffer,
            connector,
            scheduler,
            view,
            shutdown: CancellationToken::new(),
            worker: Mutex::new(None),
        }))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn api(&self) -> &MonitorApi {
        &self.api
    }

    pub fn buffer(&self) -> &Arc<EventBuffer> {
        &self.buffer
    }

    pub fn connector(&self) -> &Arc<EventStreamConnector> {
        &self.connector
    }

    pub fn scheduler(&self) -> &Arc<PollingScheduler> {
        &self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some() && !self.shutdown.is_cancelled()
    }

    /// Open the live feed, start every poll timer and begin publishing the view.
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock();
        if worker.is_some() || self.shutdown.is_cancelled() {
            return;
        }
        info!(
            target: "driftwatch::monitor",
            backend = %self.config.backend_url(),
            "monitor starting"
        );
        let notices = self.connector.subscribe();
        let status = self.connector.watch_status();
        let updates = self.scheduler.subscribe();
        self.connector.start();
        self.scheduler.start();
        let monitor = Arc::clone(self);
        *worker = Some(tokio::spawn(monitor.run(notices, status, updates)));
    }

    /// Close the subscription, cancel every timer and freeze the view.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.connector.stop().await;
        self.scheduler.stop().await;
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(target: "driftwatch::monitor", %err, "view task did not exit cleanly");
            }
        }
        info!(target: "driftwatch::monitor", "monitor stopped");
    }

    pub fn view(&self) -> ReconciledView {
        self.view.borrow().clone()
    }

    pub fn watch_view(&self) -> watch::Receiver<ReconciledView> {
        self.view.subscribe()
    }

    /// Current inputs to the reconciliation, read from the buffer and every poll task.
    pub fn inputs(&self) -> ViewInputs {
        let status = self.connector.status();
        ViewInputs {
            stream: self.buffer.snapshot(),
            connection: status.state,
            connection_notice: status.notice,
            health: self.scheduler.health().value(),
            drift: self.scheduler.drift().value(),
            drift_log: self.scheduler.drift_log().value(),
            training_log: self.scheduler.training_log().value(),
            recent: self.scheduler.recent().value(),
            series: self.scheduler.flags(),
        }
    }

    /// Rederive the view and publish it if anything changed.
    pub fn recompute(&self) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        let next = reconcile(&self.inputs());
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    pub async fn predict(&self, input: &PredictionInput) -> MonitorResult<PredictionResponse> {
        self.ensure_active()?;
        Ok(self.scheduler.predict(input).await?)
    }

    pub async fn train(&self) -> MonitorResult<TrainingResponse> {
        self.ensure_active()?;
        Ok(self.scheduler.train().await?)
    }

    /// Poll drift now. Returns false when a drift fetch is already running.
    pub fn check_drift_now(&self) -> bool {
        self.scheduler.refetch(SeriesKey::Drift)
    }

    pub fn refresh(&self, key: SeriesKey) -> bool {
        self.scheduler.refetch(key)
    }

    pub fn drift_report_url(&self) -> MonitorResult<Url> {
        Ok(self.api.drift_report_url()?)
    }

    fn ensure_active(&self) -> MonitorResult<()> {
        if self.shutdown.is_cancelled() {
            Err(MonitorError::Stopped)
        } else {
            Ok(())
        }
    }

    async fn run(
        self: Arc<Self>,
        mut notices: broadcast::Receiver<StreamNotice>,
        mut status: watch::Receiver<StreamStatus>,
        mut updates: broadcast::Receiver<SeriesKey>,
    ) {
        let mut sweep = interval(STALE_SWEEP);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.recompute();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                notice = notices.recv() => match notice {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                update = updates.recv() => match update {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = sweep.tick() => {}
            }
            if self.recompute() {
                debug!(target: "driftwatch::monitor", "view updated");
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
