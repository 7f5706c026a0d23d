use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use driftwatch_event_stream::metrics as stream_metrics;
use driftwatch_scheduler::metrics as poll_metrics;
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info};

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        stream_metrics::register_metrics(registry);
        poll_metrics::register_metrics(registry);
    });
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Serve `/metrics` on `port`. Port 0 disables the endpoint.
pub fn spawn_metrics_server(port: u16) -> Option<JoinHandle<()>> {
    if port == 0 {
        return None;
    }

    register_metrics();
    let registry = Arc::new(global_registry().clone());
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target: "driftwatch::metrics", %addr, "metrics server listening");
    Some(tokio::spawn(async move {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                    error!(target: "driftwatch::metrics", ?err, "metrics server exited with error");
                }
            }
            Err(err) => {
                error!(target: "driftwatch::metrics", ?err, "failed to bind metrics listener");
            }
        }
    }))
}

/// Prometheus text exposition of everything registered so far.
pub fn render(registry: &Registry) -> Result<(String, String), prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    let body = String::from_utf8(buffer)
        .map_err(|err| prometheus::Error::Msg(format!("metrics are not utf-8: {err}")))?;
    Ok((encoder.format_type().to_string(), body))
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    match render(&registry) {
        Ok((format_type, body)) => match HeaderValue::from_str(&format_type) {
            Ok(value) => ([(header::CONTENT_TYPE, value)], body).into_response(),
            Err(err) => {
                error!(target: "driftwatch::metrics", ?err, "failed to build content-type header");
                (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
            }
        },
        Err(err) => {
            error!(target: "driftwatch::metrics", ?err, "failed to encode prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_families_render() {
        register_metrics();
        driftwatch_event_stream::metrics::record_rejected();
        driftwatch_scheduler::metrics::record_skipped("drift");
        let (format_type, body) = render(global_registry()).unwrap();
        assert!(format_type.starts_with("text/plain"));
        assert!(body.contains("driftwatch_stream_events_total"));
        assert!(body.contains("driftwatch_poll_skipped_total"));
    }
}
