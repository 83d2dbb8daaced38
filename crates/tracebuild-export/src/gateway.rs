//! Exporter gateway: protocol selection and the non-fatal dispatch path.

use crate::{GrpcSpanExporter, HttpSpanExporter, ZipkinSpanExporter};
use async_trait::async_trait;
use std::time::Duration;
use tracebuild_core::{ConfigError, ExportError, ExporterConfig, ExporterMode, Span};
use tracing::{debug, warn};

/// Fixed per-call timeout shared by all protocol adapters.
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(2);

/// A wire-protocol adapter transmitting span batches.
#[async_trait]
pub trait SpanExporter: Send + Sync {
    /// Transmit one batch of finished spans.
    async fn export(&self, batch: &[Span]) -> Result<(), ExportError>;

    /// Adapter name for log lines.
    fn name(&self) -> &'static str;
}

/// Owns the configured adapter for one build run and enforces the failure
/// policy: transport errors are logged and swallowed, so telemetry loss can
/// never change the build's own outcome.
pub struct ExporterGateway {
    exporter: Box<dyn SpanExporter>,
}

impl ExporterGateway {
    /// Build the adapter selected by `config.mode`.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, ConfigError> {
        let exporter: Box<dyn SpanExporter> = match config.mode {
            ExporterMode::Grpc => Box::new(GrpcSpanExporter::new(config)?),
            ExporterMode::Http => Box::new(HttpSpanExporter::new(config)?),
            ExporterMode::Zipkin => Box::new(ZipkinSpanExporter::new(config)?),
        };
        debug!(mode = ?config.mode, endpoint = %config.endpoint, "configured span exporter");
        Ok(Self { exporter })
    }

    /// Wrap an already-built adapter. Test seam.
    pub fn with_exporter(exporter: Box<dyn SpanExporter>) -> Self {
        Self { exporter }
    }

    /// Send a batch, absorbing any failure.
    pub async fn dispatch(&self, batch: Vec<Span>) {
        if batch.is_empty() {
            return;
        }
        match self.exporter.export(&batch).await {
            Ok(()) => {
                debug!(
                    count = batch.len(),
                    exporter = self.exporter.name(),
                    "exported span batch"
                );
            }
            Err(error) => {
                warn!(
                    count = batch.len(),
                    exporter = self.exporter.name(),
                    %error,
                    "failed to export span batch; spans dropped"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryExporter;
    use tracebuild_core::{SpanStatus, TraceId};

    struct FailingExporter;

    #[async_trait]
    impl SpanExporter for FailingExporter {
        async fn export(&self, _batch: &[Span]) -> Result<(), ExportError> {
            Err(ExportError::Transport("connection refused".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn closed_span(name: &str) -> Span {
        let mut span = Span::root(TraceId::generate(), name, 1);
        span.close(2, SpanStatus::Ok);
        span
    }

    #[tokio::test]
    async fn test_dispatch_forwards_batches() {
        let exporter = InMemoryExporter::new();
        let gateway = ExporterGateway::with_exporter(Box::new(exporter.clone()));

        gateway.dispatch(vec![closed_span("a"), closed_span("b")]).await;

        assert_eq!(exporter.exported().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_transport_failures() {
        let gateway = ExporterGateway::with_exporter(Box::new(FailingExporter));
        // Must not panic or surface the error.
        gateway.dispatch(vec![closed_span("a")]).await;
    }

    #[tokio::test]
    async fn test_dispatch_skips_empty_batches() {
        let exporter = InMemoryExporter::new();
        let gateway = ExporterGateway::with_exporter(Box::new(exporter.clone()));
        gateway.dispatch(Vec::new()).await;
        assert!(exporter.exported().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_selects_adapter() {
        for mode in [ExporterMode::Grpc, ExporterMode::Http, ExporterMode::Zipkin] {
            let config = ExporterConfig::new("http://localhost:4318/v1/traces", mode);
            assert!(ExporterGateway::from_config(&config).is_ok());
        }
    }
}
