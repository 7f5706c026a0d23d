use std::fmt::Write as _;

use anyhow::Result;
use clap::ValueEnum;
use driftwatch_core_types::{DriftLogEntry, PredictionRecord, TrainingLogEntry};
use driftwatch_state_center::ReconciledView;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Print `value` as JSON/YAML, or the `human` rendering.
pub fn emit<T, F>(format: OutputFormat, value: &T, human: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => println!("{}", human(value)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

pub fn render_view(view: &ReconciledView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "model: {}{}   feed: {}",
        view.model_status,
        view.model_type
            .as_deref()
            .map(|t| format!(" ({t})"))
            .unwrap_or_default(),
        view.connection
    );
    if let Some(notice) = &view.connection_notice {
        let _ = writeln!(out, "  ! {notice}");
    }
    let _ = writeln!(
        out,
        "drift: {}   score: {:.3}   checks: {}",
        if view.drift_detected { "detected" } else { "none" },
        view.drift_score,
        view.drift_checks
    );
    for (feature, shift) in view.feature_shifts.iter().take(3) {
        let _ = writeln!(out, "  {feature:<24} {shift:+.3}");
    }
    let rate = view
        .positive_rate
        .map(|rate| format!("{:.0}% positive", rate * 100.0))
        .unwrap_or_else(|| "n/a".to_string());
    let _ = writeln!(
        out,
        "predictions: {} from {:?}   {}",
        view.predictions.len(),
        view.prediction_source,
        rate
    );
    if let Some(latest) = &view.latest_prediction {
        let _ = writeln!(out, "  latest: {}", render_prediction(latest));
    }
    for (key, flags) in &view.series {
        if let Some(error) = &flags.error {
            let _ = writeln!(out, "  {key}: error: {error}");
        } else if flags.stale {
            let _ = writeln!(out, "  {key}: stale");
        }
    }
    out.trim_end().to_string()
}

pub fn render_prediction(record: &PredictionRecord) -> String {
    format!(
        "{}  {}  age={} glucose={} bmi={} bp={}/{}",
        record.timestamp,
        if record.is_positive() { "positive" } else { "negative" },
        record.features.age,
        record.features.glucose,
        record.features.bmi,
        record.features.systolic_bp,
        record.features.diastolic_bp
    )
}

pub fn render_predictions(records: &Vec<PredictionRecord>) -> String {
    if records.is_empty() {
        return "no recent predictions".to_string();
    }
    records
        .iter()
        .map(render_prediction)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_drift_log(entries: &Vec<DriftLogEntry>) -> String {
    if entries.is_empty() {
        return "no drift checks recorded".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}  {}  score={:.3}{}",
                entry.timestamp,
                if entry.drift_detected { "DRIFT" } else { "ok   " },
                entry.drift_score,
                entry
                    .max_shift
                    .map(|shift| format!(" max_shift={shift:.3}"))
                    .unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_training_log(entries: &Vec<TrainingLogEntry>) -> String {
    if entries.is_empty() {
        return "no training runs recorded".to_string();
    }
    entries
        .iter()
        .map(|entry| format!("{}  {}", entry.timestamp, entry.action))
        .collect::<Vec<_>>()
        .join("\n")
}
