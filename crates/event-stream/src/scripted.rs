//! In-memory [`MessageSource`] that replays canned sessions.
//!
//! Each `open` consumes the next queued session. A session either fails to open or
//! yields its steps in order; once its steps run out it stays silent until closed.
//! The source counts live subscriptions so tests can assert that the connector never
//! holds two at once.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use driftwatch_transport::{MessageSource, StreamError, Subscription};
use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Clone, Debug)]
pub enum ScriptStep {
    Message(String),
    /// Wait before the next step.
    Pause(Duration),
    Fail(StreamError),
    /// Server closes the stream cleanly.
    End,
}

type Session = Result<Vec<ScriptStep>, StreamError>;

#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    max_live: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct ScriptedSource {
    sessions: Arc<Mutex<VecDeque<Session>>>,
    opens: Arc<Mutex<Vec<Instant>>>,
    counters: Arc<Counters>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session that opens and then plays `steps`.
    pub fn session(self, steps: Vec<ScriptStep>) -> Self {
        self.sessions.lock().push_back(Ok(steps));
        self
    }

    /// Queue an open attempt that fails immediately.
    pub fn refuse(self, error: StreamError) -> Self {
        self.sessions.lock().push_back(Err(error));
        self
    }

    pub fn push_session(&self, steps: Vec<ScriptStep>) {
        self.sessions.lock().push_back(Ok(steps));
    }

    /// Instants at which `open` was called, in order.
    pub fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().len()
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn open(&self) -> Result<Box<dyn Subscription>, StreamError> {
        self.opens.lock().push(Instant::now());
        // An exhausted script opens a silent session.
        let session = self.sessions.lock().pop_front().unwrap_or(Ok(Vec::new()));
        let steps = session?;

        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(ScriptedSubscription {
            steps: steps.into(),
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

struct ScriptedSubscription {
    steps: VecDeque<ScriptStep>,
    counters: Arc<Counters>,
    closed: bool,
}

impl ScriptedSubscription {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Subscription for ScriptedSubscription {
    async fn next_message(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            if self.closed {
                return None;
            }
            match self.steps.pop_front() {
                Some(ScriptStep::Message(payload)) => return Some(Ok(payload)),
                Some(ScriptStep::Pause(duration)) => tokio::time::sleep(duration).await,
                Some(ScriptStep::Fail(err)) => return Some(Err(err)),
                Some(ScriptStep::End) => return None,
                None => std::future::pending::<()>().await,
            }
        }
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl Drop for ScriptedSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
