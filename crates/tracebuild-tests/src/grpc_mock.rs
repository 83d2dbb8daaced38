//! In-process gRPC trace collector recording every export call.

use opentelemetry_proto::tonic::collector::trace::v1::trace_service_server::{
    TraceService, TraceServiceServer,
};
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use std::sync::{Arc, Mutex};
use tonic::metadata::MetadataMap;
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;

/// One received `TraceService/Export` call: the request metadata (gRPC
/// headers) and the decoded payload.
#[derive(Debug, Clone)]
pub struct RecordedExport {
    pub metadata: MetadataMap,
    pub request: ExportTraceServiceRequest,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<RecordedExport>>>,
}

#[tonic::async_trait]
impl TraceService for Recorder {
    async fn export(
        &self,
        request: tonic::Request<ExportTraceServiceRequest>,
    ) -> Result<tonic::Response<ExportTraceServiceResponse>, tonic::Status> {
        let metadata = request.metadata().clone();
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedExport {
                metadata,
                request: request.into_inner(),
            });
        Ok(tonic::Response::new(ExportTraceServiceResponse::default()))
    }
}

/// A mock OTLP gRPC collector bound to a free local port.
pub struct MockTraceCollector {
    uri: String,
    calls: Arc<Mutex<Vec<RecordedExport>>>,
}

impl MockTraceCollector {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let incoming = TcpIncoming::from_listener(listener, true, None)
            .map_err(|e| anyhow::anyhow!("failed to wrap listener: {e}"))?;

        let recorder = Recorder::default();
        let calls = Arc::clone(&recorder.calls);
        tokio::spawn(
            Server::builder()
                .add_service(TraceServiceServer::new(recorder))
                .serve_with_incoming(incoming),
        );

        Ok(Self {
            uri: format!("http://{addr}"),
            calls,
        })
    }

    /// Endpoint URI for the exporter configuration.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Snapshot of all export calls received so far, in arrival order.
    pub fn exports(&self) -> Vec<RecordedExport> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// All spans received so far, flattened across calls in arrival order.
    pub fn spans(&self) -> Vec<opentelemetry_proto::tonic::trace::v1::Span> {
        self.exports()
            .iter()
            .flat_map(|export| export.request.resource_spans.iter())
            .flat_map(|resource| resource.scope_spans.iter())
            .flat_map(|scope| scope.spans.iter())
            .cloned()
            .collect()
    }
}
