//! Zipkin V2 adapter: POSTs a JSON span array.
//!
//! This adapter deliberately forwards neither the configured custom headers
//! nor the identifying `User-Agent` value: the Zipkin exporter contract has
//! no header-injection point, and that limitation is preserved here.

use crate::gateway::{SpanExporter, EXPORT_TIMEOUT};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracebuild_core::{ConfigError, ExportError, ExporterConfig, Span, SpanStatus};

/// Fixed service name reported in the Zipkin local endpoint, deliberately
/// distinct from the configured `service.name` attribute.
pub const ZIPKIN_SERVICE_NAME: &str = "tracebuild-build";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZipkinEndpoint {
    service_name: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZipkinSpan {
    trace_id: String,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    name: String,
    /// Microseconds since the unix epoch.
    timestamp: u64,
    /// Microseconds.
    duration: u64,
    local_endpoint: ZipkinEndpoint,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
}

fn encode_span(span: &Span) -> ZipkinSpan {
    let mut tags: BTreeMap<String, String> = span
        .attributes
        .iter()
        .map(|(key, value)| (key.to_string(), value.render()))
        .collect();
    if let SpanStatus::Error { message } = &span.status {
        tags.insert("error".to_string(), message.clone());
    }

    ZipkinSpan {
        trace_id: span.trace_id.to_string(),
        id: span.span_id.to_string(),
        parent_id: span.parent_span_id.map(|id| id.to_string()),
        name: span.name.clone(),
        timestamp: span.start_unix_nano / 1_000,
        duration: (span.end_or_start() - span.start_unix_nano) / 1_000,
        local_endpoint: ZipkinEndpoint {
            service_name: ZIPKIN_SERVICE_NAME,
        },
        tags,
    }
}

pub struct ZipkinSpanExporter {
    client: reqwest::Client,
    endpoint: String,
}

impl ZipkinSpanExporter {
    pub fn new(config: &ExporterConfig) -> Result<Self, ConfigError> {
        // No default headers: custom headers and the SDK User-Agent are
        // intentionally not forwarded on this protocol.
        let client = reqwest::Client::builder()
            .timeout(EXPORT_TIMEOUT)
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl SpanExporter for ZipkinSpanExporter {
    async fn export(&self, batch: &[Span]) -> Result<(), ExportError> {
        let spans: Vec<ZipkinSpan> = batch.iter().map(encode_span).collect();

        let response = self
            .client
            .post(&self.endpoint)
            .json(&spans)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExportError::Timeout
                } else {
                    ExportError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ExportError::Transport(format!(
                "unexpected response status {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "zipkin"
    }
}
