use std::sync::Arc;

use driftwatch_core_types::{ConnectionState, PredictionRecord};
use driftwatch_state_center::EventBuffer;
use driftwatch_transport::{MessageSource, StreamError, Subscription};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::metrics;
use crate::notice::{StreamNotice, StreamStatus, RECONNECT_NOTICE};

enum Step {
    Stop,
    Message(Option<Result<String, StreamError>>),
}

/// Owns the single live subscription and the reconnect loop around it.
pub struct EventStreamConnector {
    source: Arc<dyn MessageSource>,
    buffer: Arc<EventBuffer>,
    config: StreamConfig,
    status: watch::Sender<StreamStatus>,
    notices: broadcast::Sender<StreamNotice>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventStreamConnector {
    pub fn new(
        source: Arc<dyn MessageSource>,
        buffer: Arc<EventBuffer>,
        config: StreamConfig,
    ) -> Arc<Self> {
        let (status, _) = watch::channel(StreamStatus::default());
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));
        Arc::new(Self {
            source,
            buffer,
            config,
            status,
            notices,
            shutdown: CancellationToken::new(),
            worker: Mutex::new(None),
        })
    }

    pub fn buffer(&self) -> &Arc<EventBuffer> {
        &self.buffer
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamNotice> {
        self.notices.subscribe()
    }

    pub fn watch_status(&self) -> watch::Receiver<StreamStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some() && !self.shutdown.is_cancelled()
    }

    /// Enter `Connecting` and spawn the connection loop. Calling it twice is a no-op,
    /// as is calling it after [`stop`](Self::stop).
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock();
        if worker.is_some() || self.shutdown.is_cancelled() {
            return;
        }
        self.update(|status| status.state = ConnectionState::Connecting);
        let connector = Arc::clone(self);
        *worker = Some(tokio::spawn(connector.run()));
    }

    /// Close the live subscription and suppress any pending reconnect.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(target: "driftwatch::stream", %err, "connector task did not exit cleanly");
            }
        }
    }

    async fn run(self: Arc<Self>) {
        info!(
            target: "driftwatch::stream",
            source = %self.source.describe(),
            delay_ms = self.config.reconnect_delay_ms,
            "event stream connector started"
        );
        let mut first_attempt = true;
        loop {
            if !first_attempt {
                metrics::record_reconnect();
                self.update(|status| {
                    status.state = ConnectionState::Connecting;
                    status.reconnects += 1;
                });
            }
            first_attempt = false;

            let opened = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                opened = self.source.open() => opened,
            };
            if self.shutdown.is_cancelled() {
                if let Ok(mut subscription) = opened {
                    subscription.close().await;
                }
                break;
            }

            let reason = match opened {
                Ok(subscription) => match self.pump(subscription).await {
                    Some(reason) => reason,
                    None => break,
                },
                Err(err) => err.to_string(),
            };
            self.on_error(reason);

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = sleep(self.config.reconnect_delay()) => {}
            }
        }
        debug!(target: "driftwatch::stream", "event stream connector stopped");
    }

    /// Drive one open subscription until it fails or ends. Returns the failure reason,
    /// or `None` when stopped.
    async fn pump(&self, mut subscription: Box<dyn Subscription>) -> Option<String> {
        self.on_open();
        loop {
            let step = tokio::select! {
                _ = self.shutdown.cancelled() => Step::Stop,
                message = subscription.next_message() => Step::Message(message),
            };
            match step {
                Step::Stop => {
                    subscription.close().await;
                    return None;
                }
                Step::Message(Some(Ok(payload))) => self.on_message(&payload),
                Step::Message(Some(Err(err))) => {
                    subscription.close().await;
                    return Some(err.to_string());
                }
                Step::Message(None) => {
                    subscription.close().await;
                    return Some("event stream ended by server".to_string());
                }
            }
        }
    }

    fn on_open(&self) {
        metrics::record_opened();
        self.update(|status| {
            status.state = ConnectionState::Open;
            status.last_error = None;
            status.notice = None;
        });
        info!(target: "driftwatch::stream", "event stream open");
        let _ = self.notices.send(StreamNotice::Opened);
    }

    fn on_message(&self, payload: &str) {
        match PredictionRecord::from_json(payload) {
            Ok(record) => {
                self.buffer.push(record.clone());
                metrics::record_accepted();
                self.update(|status| status.received += 1);
                // No receivers is fine; the buffer is the source of truth.
                let _ = self.notices.send(StreamNotice::Event(record));
            }
            Err(err) => {
                metrics::record_rejected();
                self.update(|status| status.rejected += 1);
                warn!(
                    target: "driftwatch::stream",
                    %err,
                    bytes = payload.len(),
                    "discarding undecodable event"
                );
            }
        }
    }

    fn on_error(&self, reason: String) {
        if self.shutdown.is_cancelled() {
            return;
        }
        metrics::record_disconnect();
        warn!(
            target: "driftwatch::stream",
            %reason,
            delay_ms = self.config.reconnect_delay_ms,
            "event stream lost; reconnect scheduled"
        );
        self.update(|status| {
            status.state = ConnectionState::Reconnecting;
            status.last_error = Some(reason.clone());
            status.notice = Some(RECONNECT_NOTICE.to_string());
        });
        let _ = self.notices.send(StreamNotice::Disconnected { reason });
    }

    fn update(&self, apply: impl FnOnce(&mut StreamStatus)) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.status.send_modify(apply);
    }
}

impl Drop for EventStreamConnector {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
