use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::StreamError;
use crate::sse::{SseDecoder, SseMessage};

/// An ordered, single-consumer source of pushed messages.
///
/// `open` yields a [`Subscription`]; callers must `close` it before opening another one.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Subscription>, StreamError>;

    fn describe(&self) -> String;
}

#[async_trait]
pub trait Subscription: Send {
    /// Next message payload in arrival order. `None` means the server ended the stream.
    async fn next_message(&mut self) -> Option<Result<String, StreamError>>;

    async fn close(&mut self);
}

/// `text/event-stream` subscription over a streaming HTTP GET.
#[derive(Clone)]
pub struct SseSource {
    client: reqwest::Client,
    url: Url,
}

impl SseSource {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl MessageSource for SseSource {
    async fn open(&self) -> Result<Box<dyn Subscription>, StreamError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|err| StreamError::Connect(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status(status.as_u16()));
        }
        debug!(target: "driftwatch::transport", url = %self.url, "event stream opened");

        Ok(Box::new(SseSubscription {
            body: response.bytes_stream().boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            closed: false,
        }))
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

struct SseSubscription {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<SseMessage>,
    closed: bool,
}

#[async_trait]
impl Subscription for SseSubscription {
    async fn next_message(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            if self.closed {
                return None;
            }
            if let Some(message) = self.pending.pop_front() {
                if message.is_default_event() {
                    return Some(Ok(message.data));
                }
                trace!(
                    target: "driftwatch::transport",
                    event = ?message.event,
                    "skipping named event"
                );
                continue;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    match self.decoder.feed(&chunk) {
                        Ok(decoded) => self.pending.extend(decoded),
                        Err(err) => {
                            warn!(target: "driftwatch::transport", %err, "dropping oversized event frame");
                            return Some(Err(err));
                        }
                    }
                }
                Some(Err(err)) => return Some(Err(StreamError::Interrupted(err.to_string()))),
                None => return None,
            }
        }
    }

    async fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
        // Dropping the body stream releases the underlying connection.
        self.body = stream::empty().boxed();
    }
}
