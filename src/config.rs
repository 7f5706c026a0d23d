//! Monitor configuration.
//!
//! Loaded from YAML, then the backend origin may be overridden from the environment
//! and finally from the command line.

use std::path::Path;

use driftwatch_event_stream::StreamConfig;
use driftwatch_scheduler::SchedulerConfig;
use driftwatch_transport::TransportConfig;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::errors::{MonitorError, MonitorResult};

/// Checked in order; the first non-empty value wins.
pub const BACKEND_URL_ENV: [&str; 2] = ["DRIFTWATCH_BACKEND_URL", "BACKEND_URL"];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub transport: TransportConfig,
    pub stream: StreamConfig,
    pub polling: SchedulerConfig,
}

impl MonitorConfig {
    pub fn from_yaml_str(raw: &str) -> MonitorResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> MonitorResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| MonitorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn backend_url(&self) -> &str {
        &self.transport.base_url
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.transport.base_url = url.into();
        self
    }

    /// Apply the backend origin from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let found = BACKEND_URL_ENV.iter().find_map(|key| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (*key, value))
        });
        if let Some((key, value)) = found {
            info!(target: "driftwatch::config", env = key, url = %value, "backend url from environment");
            self.transport.base_url = value;
        }
    }

    pub fn validate(&self) -> MonitorResult<()> {
        let url = Url::parse(&self.transport.base_url).map_err(|err| MonitorError::InvalidUrl {
            url: self.transport.base_url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MonitorError::InvalidUrl {
                url: self.transport.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if self.transport.request_timeout_ms == 0 {
            return Err(MonitorError::config("transport.request_timeout_ms must be non-zero"));
        }
        if self.stream.buffer_capacity == 0 {
            return Err(MonitorError::config("stream.buffer_capacity must be non-zero"));
        }
        self.polling.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_core_types::SeriesKey;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn empty_document_is_defaults() {
        let config = MonitorConfig::from_yaml_str("").unwrap();
        assert_eq!(config.backend_url(), "http://localhost:8000");
        assert_eq!(config.stream.reconnect_delay_ms, 3_000);
        assert_eq!(config.stream.buffer_capacity, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_sections_override_defaults() {
        let yaml = r#"
transport:
  base_url: "http://ml.internal:9000"
stream:
  reconnect_delay_ms: 1000
polling:
  retry:
    max: 4
  recentPredictions:
    interval_ms: 2000
"#;
        let config = MonitorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.backend_url(), "http://ml.internal:9000");
        assert_eq!(config.stream.reconnect_delay_ms, 1_000);
        let recent = config.polling.spec(SeriesKey::RecentPredictions);
        assert_eq!(recent.interval, Duration::from_secs(2));
        assert_eq!(recent.retry.max, 4);
        assert_eq!(config.transport.request_timeout_ms, 10_000);
    }

    #[test]
    fn primary_env_var_wins_over_fallback() {
        let env: HashMap<&str, &str> = [
            ("DRIFTWATCH_BACKEND_URL", "http://primary:8000"),
            ("BACKEND_URL", "http://fallback:8000"),
        ]
        .into_iter()
        .collect();
        let mut config = MonitorConfig::default();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.backend_url(), "http://primary:8000");
    }

    #[test]
    fn blank_primary_falls_through() {
        let env: HashMap<&str, &str> = [
            ("DRIFTWATCH_BACKEND_URL", "  "),
            ("BACKEND_URL", "http://fallback:8000"),
        ]
        .into_iter()
        .collect();
        let mut config = MonitorConfig::default();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.backend_url(), "http://fallback:8000");
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        match MonitorConfig::from_file(&path) {
            Err(MonitorError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn file_contents_are_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driftwatch.yaml");
        std::fs::write(&path, "stream:\n  buffer_capacity: 20\n").unwrap();
        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config.stream.buffer_capacity, 20);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad_url = MonitorConfig::default().with_backend_url("not a url");
        assert!(matches!(
            bad_url.validate(),
            Err(MonitorError::InvalidUrl { .. })
        ));

        let ftp = MonitorConfig::default().with_backend_url("ftp://host");
        assert!(ftp.validate().is_err());

        let mut zero_capacity = MonitorConfig::default();
        zero_capacity.stream.buffer_capacity = 0;
        assert!(matches!(zero_capacity.validate(), Err(MonitorError::Config(_))));

        let mut zero_interval = MonitorConfig::default();
        zero_interval.polling.series_mut(SeriesKey::Health).interval_ms = Some(0);
        assert!(matches!(
            zero_interval.validate(),
            Err(MonitorError::Scheduler(_))
        ));
    }
}
