use std::sync::Arc;

use driftwatch_core_types::{
    DriftLogEntry, DriftResponse, HealthResponse, PredictionInput, PredictionRecord,
    PredictionResponse, TrainingLogEntry, TrainingResponse,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::client::{endpoint_url, Transport};
use crate::error::TransportError;

const DRIFT_REPORT_PATH: &str = "/drift_report";

/// Typed facade over the prediction service endpoints.
#[derive(Clone)]
pub struct MonitorApi {
    transport: Arc<dyn Transport>,
}

impl MonitorApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn health(&self) -> Result<HealthResponse, TransportError> {
        self.call(Method::GET, "/health", None).await
    }

    pub async fn predict(
        &self,
        input: &PredictionInput,
    ) -> Result<PredictionResponse, TransportError> {
        let body = serde_json::to_value(input)
            .map_err(|err| TransportError::request(format!("unencodable input: {err}")))?;
        self.call(Method::POST, "/predict", Some(body)).await
    }

    pub async fn train(&self) -> Result<TrainingResponse, TransportError> {
        self.call(Method::POST, "/train", None).await
    }

    pub async fn training_log(&self) -> Result<Vec<TrainingLogEntry>, TransportError> {
        let value = self
            .transport
            .request(Method::GET, "/training_log", None)
            .await?;
        Ok(decode_list("training_log", value))
    }

    pub async fn drift(&self) -> Result<DriftResponse, TransportError> {
        self.call(Method::GET, "/drift", None).await
    }

    /// Historical drift checks. Anything other than an array reads as "no checks yet".
    pub async fn drift_log(&self) -> Result<Vec<DriftLogEntry>, TransportError> {
        let value = self.transport.request(Method::GET, "/drift_log", None).await?;
        Ok(decode_list("drift_log", value))
    }

    /// Recently logged predictions. The service answers `{"error": ..}` when nothing has
    /// been logged; that reads as an empty list.
    pub async fn recent(&self) -> Result<Vec<PredictionRecord>, TransportError> {
        let value = self.transport.request(Method::GET, "/recent", None).await?;
        Ok(decode_list("recent", value))
    }

    /// Location of the rendered drift report. Not fetched; the document is opaque.
    pub fn drift_report_url(&self) -> Result<Url, TransportError> {
        endpoint_url(self.transport.base_url(), DRIFT_REPORT_PATH)
    }

    pub fn events_url(&self) -> Result<Url, TransportError> {
        self.transport.stream_url()
    }

    async fn call<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
    {
        let value = self.transport.request(method.clone(), path, body).await?;
        serde_json::from_value(value).map_err(|err| {
            TransportError::decode(format!("{method} {path} returned unexpected shape: {err}"))
        })
    }
}

fn decode_list<T>(series: &str, value: Value) -> Vec<T>
where
    T: DeserializeOwned,
{
    match value {
        Value::Array(items) => {
            let total = items.len();
            let decoded: Vec<T> = items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(target: "driftwatch::transport", series, %err, "dropping malformed entry");
                        None
                    }
                })
                .collect();
            if decoded.len() != total {
                debug!(
                    target: "driftwatch::transport",
                    series,
                    kept = decoded.len(),
                    total,
                    "partial list decode"
                );
            }
            decoded
        }
        Value::Object(map) if map.contains_key("error") => {
            debug!(
                target: "driftwatch::transport",
                series,
                error = ?map.get("error"),
                "service reported no data"
            );
            Vec::new()
        }
        other => {
            debug!(
                target: "driftwatch::transport",
                series,
                shape = value_kind(&other),
                "non-array response treated as empty"
            );
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
