//! Configuration surface.
//!
//! Built once by the host from its own configuration mechanism, validated
//! before the first lifecycle event, and immutable for the run.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wire protocol used to ship span batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExporterMode {
    Grpc,
    Http,
    Zipkin,
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_drain_timeout_ms() -> u64 {
    10_000
}

/// Exporter configuration, owned by the gateway for one build run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Collector endpoint, e.g. `http://localhost:4317`.
    pub endpoint: String,

    pub mode: ExporterMode,

    /// Custom headers appended to GRPC/HTTP export calls (not Zipkin).
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Custom tags merged onto the root span, later entries winning.
    #[serde(default)]
    pub custom_tags: Vec<(String, String)>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Scheduled flush period of the batch queue.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl ExporterConfig {
    pub fn new(endpoint: impl Into<String>, mode: ExporterMode) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode,
            headers: Vec::new(),
            custom_tags: Vec::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed =
            url::Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        Ok(())
    }
}

/// Named trace viewers with a known trace base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceViewType {
    Jaeger,
    Zipkin,
}

/// Where to point the operator for the recorded trace.
///
/// With a `viewer` set, `url` is the viewer's base URL and the known
/// `trace/{traceId}` style suffix is appended before substitution. Without
/// one, `url` is used verbatim as the template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceViewConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub viewer: Option<TraceViewType>,
}

/// Full configuration for one observed build run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Build identifier, exported as the `service.name` resource attribute.
    pub service_name: String,

    /// Task names the operator requested, recorded on the root span.
    #[serde(default)]
    pub requested_tasks: Vec<String>,

    pub exporter: ExporterConfig,

    #[serde(default)]
    pub trace_view: TraceViewConfig,

    /// Bounded wait for the final flush at build shutdown.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>, exporter: ExporterConfig) -> Self {
        Self {
            service_name: service_name.into(),
            requested_tasks: Vec::new(),
            exporter,
            trace_view: TraceViewConfig::default(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        self.exporter.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let config: ExporterConfig = serde_json::from_str(
            r#"{"endpoint": "http://localhost:4317", "mode": "grpc"}"#,
        )
        .unwrap();
        assert_eq!(config.connect_timeout_ms, 2_000);
        assert_eq!(config.batch_delay_ms, 100);
        assert!(config.headers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = ExporterConfig::new("not a url", ExporterMode::Http);
        assert!(matches!(
            config.validate(),
            Err(crate::ConfigError::InvalidEndpoint { .. })
        ));

        let config = ExporterConfig::new("ftp://host:21", ExporterMode::Http);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_service_name_rejected() {
        let exporter = ExporterConfig::new("http://localhost:4318", ExporterMode::Http);
        let config = TelemetryConfig::new("  ", exporter);
        assert!(matches!(
            config.validate(),
            Err(crate::ConfigError::EmptyServiceName)
        ));
    }
}
