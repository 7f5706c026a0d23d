use anyhow::{Context, Result};
use driftwatch_core_types::{ModelStatus, SeriesKey};
use driftwatch_state_center::model_status;
use serde::Serialize;

use super::context::CliContext;
use super::output::emit;

#[derive(Serialize)]
struct StatusReport {
    backend: String,
    model_status: ModelStatus,
    model_loaded: Option<bool>,
    model_type: Option<String>,
    drift_detected: Option<bool>,
    drift_score: Option<f64>,
    errors: Vec<String>,
}

pub async fn cmd_status(ctx: &CliContext) -> Result<()> {
    let api = ctx.api()?;
    let (health, drift) = tokio::join!(api.health(), api.drift());

    let mut errors = Vec::new();
    let health = health
        .map_err(|err| errors.push(format!("{}: {err}", SeriesKey::Health)))
        .ok();
    let drift = drift
        .map_err(|err| errors.push(format!("{}: {err}", SeriesKey::Drift)))
        .ok();

    let report = StatusReport {
        backend: ctx.config().backend_url().to_string(),
        model_status: model_status(health.as_ref(), drift.as_ref()),
        model_loaded: health.as_ref().map(|h| h.model_loaded),
        model_type: health.map(|h| h.model_type),
        drift_detected: drift.as_ref().map(|d| d.drift_detected),
        drift_score: drift.map(|d| d.drift_score),
        errors,
    };

    emit(ctx.output(), &report, |report| {
        let mut lines = vec![
            format!("backend:      {}", report.backend),
            format!("model status: {}", report.model_status),
        ];
        if let Some(model_type) = &report.model_type {
            lines.push(format!("model type:   {model_type}"));
        }
        if let Some(score) = report.drift_score {
            lines.push(format!("drift score:  {score:.3}"));
        }
        lines.extend(report.errors.iter().map(|err| format!("error:        {err}")));
        lines.join("\n")
    })
}

pub fn cmd_report_url(ctx: &CliContext) -> Result<()> {
    let url = ctx
        .api()?
        .drift_report_url()
        .context("cannot build drift report url")?;
    emit(ctx.output(), &url.as_str(), |url| url.to_string())
}
