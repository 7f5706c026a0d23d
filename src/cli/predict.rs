use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use driftwatch_core_types::PredictionInput;
use serde::Serialize;

use super::context::CliContext;
use super::output::{emit, render_training_log};

#[derive(Args, Clone, Debug)]
#[command(group(ArgGroup::new("features").required(true).args(["input", "json"])))]
pub struct PredictArgs {
    /// JSON file holding the fourteen feature values
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Feature values as an inline JSON object
    #[arg(long, value_name = "JSON")]
    pub json: Option<String>,
}

impl PredictArgs {
    pub async fn features(&self) -> Result<PredictionInput> {
        let raw = match (&self.input, &self.json) {
            (Some(path), _) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
            (None, Some(json)) => json.clone(),
            (None, None) => anyhow::bail!("either --input or --json is required"),
        };
        serde_json::from_str(&raw).context("feature values must be a JSON object with all fourteen fields")
    }
}

#[derive(Serialize)]
struct PredictReport {
    prediction: u8,
    label: &'static str,
}

pub async fn cmd_predict(args: PredictArgs, ctx: &CliContext) -> Result<()> {
    let input = args.features().await?;
    let response = ctx
        .api()?
        .predict(&input)
        .await
        .context("prediction request failed")?;
    let report = PredictReport {
        prediction: response.prediction,
        label: if response.prediction == 1 { "positive" } else { "negative" },
    };
    emit(ctx.output(), &report, |report| {
        format!("prediction: {} ({})", report.prediction, report.label)
    })
}

pub async fn cmd_train(ctx: &CliContext) -> Result<()> {
    let api = ctx.api()?;
    let response = api.train().await.context("training request failed")?;
    eprintln!("{}", response.status);
    let log = api
        .training_log()
        .await
        .context("failed to fetch training log")?;
    emit(ctx.output(), &log, render_training_log)
}
