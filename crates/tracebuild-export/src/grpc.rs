//! OTLP/gRPC adapter: unary `TraceService/Export` calls over a lazy tonic
//! channel.

use crate::gateway::{SpanExporter, EXPORT_TIMEOUT};
use crate::otlp;
use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_client::TraceServiceClient;
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::Channel;
use tracebuild_core::{user_agent, ConfigError, ExportError, ExporterConfig, Span};

pub struct GrpcSpanExporter {
    client: TraceServiceClient<Channel>,
    metadata: MetadataMap,
}

impl GrpcSpanExporter {
    pub fn new(config: &ExporterConfig) -> Result<Self, ConfigError> {
        let endpoint = Channel::from_shared(config.endpoint.clone())
            .map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            })?
            .user_agent(user_agent())
            .map_err(|e| ConfigError::Transport(e.to_string()))?
            .timeout(EXPORT_TIMEOUT)
            .connect_timeout(config.connect_timeout());

        // Lazy connect: the channel dials on the first export call, so an
        // unreachable collector cannot fail session construction.
        let client = TraceServiceClient::new(endpoint.connect_lazy());

        let mut metadata = MetadataMap::new();
        for (key, value) in &config.headers {
            let name: MetadataKey<Ascii> = key
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| ConfigError::InvalidHeaderName(key.clone()))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|_| ConfigError::InvalidHeaderValue(key.clone()))?;
            metadata.insert(name, value);
        }

        Ok(Self { client, metadata })
    }
}

#[async_trait]
impl SpanExporter for GrpcSpanExporter {
    async fn export(&self, batch: &[Span]) -> Result<(), ExportError> {
        let mut request = tonic::Request::new(otlp::encode_request(batch));
        *request.metadata_mut() = self.metadata.clone();

        self.client
            .clone()
            .export(request)
            .await
            .map_err(|status| match status.code() {
                tonic::Code::DeadlineExceeded => ExportError::Timeout,
                _ => ExportError::Transport(status.to_string()),
            })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "otlp-grpc"
    }
}
