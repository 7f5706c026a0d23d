use std::time::Instant;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::source::SseSource;

pub const EVENTS_PATH: &str = "/events";

const ERROR_BODY_PREVIEW: usize = 256;

/// Request/response access to the prediction service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError>;

    fn base_url(&self) -> &Url;

    fn stream_url(&self) -> Result<Url, TransportError> {
        endpoint_url(self.base_url(), EVENTS_PATH)
    }
}

/// Resolve `path` below `base`, keeping any path prefix the base already carries.
pub fn endpoint_url(base: &Url, path: &str) -> Result<Url, TransportError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map_err(|err| TransportError::request(format!("invalid endpoint {joined}: {err}")))
}

#[derive(Clone)]
pub struct HttpTransport {
    cfg: TransportConfig,
    base: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(cfg: TransportConfig) -> Result<Self, TransportError> {
        let base = Url::parse(&cfg.base_url).map_err(|err| {
            TransportError::request(format!("invalid base url {}: {err}", cfg.base_url))
        })?;
        // No client-wide timeout: the event stream shares this client and stays open.
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .tcp_keepalive(Some(std::time::Duration::from_secs(30)))
            .connect_timeout(cfg.connect_timeout())
            .build()
            .map_err(|err| TransportError::request(format!("failed to build http client: {err}")))?;
        Ok(Self { cfg, base, client })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.cfg
    }

    /// Event source for `/events`, sharing this transport's connection pool.
    pub fn event_source(&self) -> Result<SseSource, TransportError> {
        Ok(SseSource::new(self.client.clone(), self.stream_url()?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        let url = endpoint_url(&self.base, path)?;
        let context = format!("{method} {path}");
        let mut builder = self
            .client
            .request(method.clone(), url)
            .timeout(self.cfg.request_timeout());
        if let Some(body) = body.as_ref() {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest(&context, err))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::from_reqwest(&context, err))?;
        debug!(
            target: "driftwatch::transport",
            %method,
            path,
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        if !status.is_success() {
            let preview = String::from_utf8_lossy(&bytes);
            let preview: String = preview.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(TransportError::http_status(
                status.as_u16(),
                format!("{context} returned {status}: {preview}"),
            ));
        }

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            TransportError::decode(format!("{context} returned malformed json: {err}"))
                .with_status(status.as_u16())
        })
    }

    fn base_url(&self) -> &Url {
        &self.base
    }
}
