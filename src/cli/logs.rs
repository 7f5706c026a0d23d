use anyhow::{Context, Result};
use clap::Args;

use super::context::CliContext;
use super::output::{emit, render_drift_log, render_predictions, render_training_log};

#[derive(Args, Clone, Debug)]
pub struct RecentArgs {
    /// Show at most this many predictions
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub async fn cmd_drift_log(ctx: &CliContext) -> Result<()> {
    let entries = ctx
        .api()?
        .drift_log()
        .await
        .context("failed to fetch drift log")?;
    emit(ctx.output(), &entries, render_drift_log)
}

pub async fn cmd_training_log(ctx: &CliContext) -> Result<()> {
    let entries = ctx
        .api()?
        .training_log()
        .await
        .context("failed to fetch training log")?;
    emit(ctx.output(), &entries, render_training_log)
}

pub async fn cmd_recent(args: RecentArgs, ctx: &CliContext) -> Result<()> {
    let mut records = ctx
        .api()?
        .recent()
        .await
        .context("failed to fetch recent predictions")?;
    records.truncate(args.limit);
    emit(ctx.output(), &records, render_predictions)
}
