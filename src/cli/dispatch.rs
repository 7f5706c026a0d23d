use anyhow::Result;

use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::info::cmd_info;
use super::logs::{cmd_drift_log, cmd_recent, cmd_training_log};
use super::predict::{cmd_predict, cmd_train};
use super::status::{cmd_report_url, cmd_status};
use super::watch::cmd_watch;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Watch(args) => cmd_watch(args, ctx).await,
        Commands::Status => cmd_status(ctx).await,
        Commands::Predict(args) => cmd_predict(args, ctx).await,
        Commands::Train => cmd_train(ctx).await,
        Commands::DriftLog => cmd_drift_log(ctx).await,
        Commands::TrainingLog => cmd_training_log(ctx).await,
        Commands::Recent(args) => cmd_recent(args, ctx).await,
        Commands::ReportUrl => cmd_report_url(ctx),
        Commands::Info => cmd_info(ctx),
    }
}
