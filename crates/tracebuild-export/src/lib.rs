//! tracebuild Export
//!
//! The exporter gateway: serializes finished spans into one of three wire
//! protocols and transmits them with a bounded per-call timeout. Transport
//! failures are caught here, logged, and never reach the observed build.

pub mod gateway;
pub mod grpc;
pub mod http;
pub mod memory;
pub mod otlp;
pub mod zipkin;

pub use gateway::{ExporterGateway, SpanExporter, EXPORT_TIMEOUT};
pub use grpc::GrpcSpanExporter;
pub use http::HttpSpanExporter;
pub use memory::InMemoryExporter;
pub use zipkin::{ZipkinSpanExporter, ZIPKIN_SERVICE_NAME};
