use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use driftwatch_transport::{HttpTransport, MonitorApi};
use once_cell::sync::OnceCell;

use super::output::OutputFormat;
use crate::config::MonitorConfig;

pub struct CliContext {
    config: Arc<MonitorConfig>,
    config_path: Option<PathBuf>,
    output: OutputFormat,
    metrics_port: u16,
    api: OnceCell<MonitorApi>,
}

impl CliContext {
    pub fn new(
        config: MonitorConfig,
        config_path: Option<PathBuf>,
        output: OutputFormat,
        metrics_port: u16,
    ) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
            metrics_port,
            api: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn metrics_port(&self) -> u16 {
        self.metrics_port
    }

    /// Typed client for one-shot commands, built on first use.
    pub fn api(&self) -> Result<&MonitorApi> {
        self.api.get_or_try_init(|| {
            let transport = HttpTransport::new(self.config.transport.clone())
                .context("failed to build HTTP client")?;
            Ok(MonitorApi::new(Arc::new(transport)))
        })
    }
}
