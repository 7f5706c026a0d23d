use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::MonitorConfig;

/// RUST_LOG wins; otherwise `level`, forced to DEBUG by `debug`. Logs go to stderr so
/// command output on stdout stays machine-readable.
pub fn init_logging(
    level: &str,
    debug: bool,
    json: bool,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .context("log file path has no file name")?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(file_layer)
        .init();

    Ok(guard)
}

pub struct LoadedConfig {
    pub config: MonitorConfig,
    /// File the configuration came from, if one existed.
    pub path: Option<PathBuf>,
}

/// Candidate config files, most specific first.
pub fn config_candidates(explicit: Option<&PathBuf>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.clone()];
    }
    let mut candidates = vec![PathBuf::from("config/driftwatch.yaml")];
    if let Some(mut path) = dirs::config_dir() {
        path.push("driftwatch");
        path.push("config.yaml");
        candidates.push(path);
    }
    candidates
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    for candidate in config_candidates(config_path) {
        if !candidate.exists() {
            if config_path.is_some() {
                anyhow::bail!("config file {} does not exist", candidate.display());
            }
            continue;
        }
        let config = MonitorConfig::from_file(&candidate)
            .with_context(|| format!("Failed to load config file {}", candidate.display()))?;
        info!("Loaded configuration from: {}", candidate.display());
        return Ok(LoadedConfig {
            config,
            path: Some(candidate),
        });
    }
    warn!("No config file found, using defaults");
    Ok(LoadedConfig {
        config: MonitorConfig::default(),
        path: None,
    })
}

/// File, then environment, then command line.
pub fn apply_overrides(config: &mut MonitorConfig, backend_url: Option<&str>) -> Result<()> {
    config.apply_env();
    if let Some(url) = backend_url {
        config.transport.base_url = url.to_string();
    }
    config.validate().context("invalid configuration")?;
    Ok(())
}
