//! tracebuild Core
//!
//! Core domain types for the tracebuild telemetry pipeline.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across the other crates: the span model, the build lifecycle event
//! type, the configuration surface, and the error taxonomy.

pub mod config;
pub mod error;
pub mod event;
pub mod span;

pub use config::{ExporterConfig, ExporterMode, TelemetryConfig, TraceViewConfig, TraceViewType};
pub use error::{ConfigError, ExportError, ObservationError};
pub use event::{BuildEvent, TaskOutcome};
pub use span::{unix_nano_now, AttributeValue, Attributes, Span, SpanId, SpanStatus, TraceId};

/// SDK name reported in resource attributes and the `User-Agent` header.
pub const SDK_NAME: &str = "tracebuild";

/// SDK version reported in resource attributes and the `User-Agent` header.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `User-Agent` value sent on OTLP gRPC and HTTP export calls.
pub fn user_agent() -> String {
    format!("{SDK_NAME}/{SDK_VERSION}")
}
