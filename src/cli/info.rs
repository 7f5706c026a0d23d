use anyhow::Result;
use serde::Serialize;

use super::context::CliContext;
use super::output::emit;
use crate::config::MonitorConfig;

#[derive(Serialize)]
struct InfoReport<'a> {
    version: &'static str,
    build_date: &'static str,
    git_commit: &'static str,
    git_branch: &'static str,
    config_file: Option<String>,
    metrics_port: u16,
    config: &'a MonitorConfig,
}

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let report = InfoReport {
        version: env!("CARGO_PKG_VERSION"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        git_commit: option_env!("GIT_HASH").unwrap_or("unknown"),
        git_branch: option_env!("GIT_BRANCH").unwrap_or("unknown"),
        config_file: ctx.config_path().map(|path| path.display().to_string()),
        metrics_port: ctx.metrics_port(),
        config: ctx.config(),
    };

    emit(ctx.output(), &report, |report| {
        let config = report.config;
        let mut lines = vec![
            "driftwatch".to_string(),
            "==========".to_string(),
            format!("Version: {}", report.version),
            format!("Build Date: {}", report.build_date),
            format!("Git Commit: {} ({})", report.git_commit, report.git_branch),
            String::new(),
            "Configuration:".to_string(),
            format!(
                "- Config File: {}",
                report.config_file.as_deref().unwrap_or("(defaults)")
            ),
            format!("- Backend: {}", config.backend_url()),
            format!("- Request Timeout: {}ms", config.transport.request_timeout_ms),
            format!("- Reconnect Delay: {}ms", config.stream.reconnect_delay_ms),
            format!("- Buffer Capacity: {}", config.stream.buffer_capacity),
            format!(
                "- Metrics: {}",
                if report.metrics_port == 0 {
                    "disabled".to_string()
                } else {
                    format!("port {}", report.metrics_port)
                }
            ),
            "- Polling:".to_string(),
        ];
        for key in driftwatch_core_types::SeriesKey::ALL {
            let spec = config.polling.spec(key);
            lines.push(format!(
                "  - {:<18} every {:>6}ms  retries={} stale>{}ms",
                key.as_str(),
                spec.interval.as_millis(),
                spec.retry.max,
                spec.stale_after.as_millis()
            ));
        }
        lines.join("\n")
    })
}
