//! tracebuild
//!
//! Observes the execution of a build — a root process plus an
//! ordered/parallel set of sub-tasks — and produces a causally-correct
//! distributed trace, ships it over a pluggable wire protocol, and surfaces
//! a trace-view link to the operator.
//!
//! The host build engine reports [`BuildEvent`]s to a [`BuildTelemetry`]
//! session. The session maintains the span tree, enriches spans, batches
//! them through the configured exporter, and on build finish drains the
//! queue (bounded wait) and logs the trace-view URL.
//!
//! ```no_run
//! use tracebuild::{BuildEvent, BuildTelemetry};
//! use tracebuild_core::{ExporterConfig, ExporterMode, TelemetryConfig};
//!
//! let exporter = ExporterConfig::new("http://localhost:4318/v1/traces", ExporterMode::Http);
//! let config = TelemetryConfig::new("my-service", exporter);
//! let session = BuildTelemetry::new(config).unwrap();
//!
//! session.handle(BuildEvent::BuildStarted { build_name: "my-service".into() }).unwrap();
//! session.handle(BuildEvent::task_started(":compile", "Compile")).unwrap();
//! session.handle(BuildEvent::task_succeeded(":compile")).unwrap();
//! session.handle(BuildEvent::BuildFinished).unwrap();
//! ```

pub mod batch;
pub mod enrich;
pub mod session;
pub mod tree;
pub mod view;

pub use batch::BatchQueue;
pub use enrich::AttributeEnricher;
pub use session::BuildTelemetry;
pub use tree::{BuildTrace, SpanTreeBuilder};
pub use view::{trace_view_log_line, TraceIdTracker, TraceViewUrlResolver};

pub use tracebuild_core::{BuildEvent, TaskOutcome};
