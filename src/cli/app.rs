use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{apply_overrides, init_logging, load_config, LoadedConfig};
use crate::metrics;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let _log_guard = init_logging(
        &cli.log_level,
        cli.debug,
        cli.log_json,
        cli.log_file.as_deref(),
    )?;
    let _metrics_server = metrics::spawn_metrics_server(cli.metrics_port);

    debug!("Starting driftwatch v{}", env!("CARGO_PKG_VERSION"));

    let LoadedConfig { mut config, path } = load_config(cli.config.as_ref()).await?;
    apply_overrides(&mut config, cli.backend_url.as_deref())?;
    let cli_context = CliContext::new(config, path, cli.output, cli.metrics_port);

    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            debug!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
