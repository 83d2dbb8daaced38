//! Trace identifier capture and trace-view URL resolution.

use std::sync::OnceLock;
use tracebuild_core::{TraceId, TraceViewConfig, TraceViewType, SDK_NAME};

/// Literal token replaced by the hex trace id. No other tokens exist.
const TRACE_ID_TOKEN: &str = "{traceId}";

/// Captures the trace id assigned to the root span at build start.
#[derive(Debug, Default)]
pub struct TraceIdTracker(OnceLock<TraceId>);

impl TraceIdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the run's trace id. Later calls are ignored; a build run has
    /// exactly one trace.
    pub fn record(&self, trace_id: TraceId) {
        let _ = self.0.set(trace_id);
    }

    pub fn get(&self) -> Option<TraceId> {
        self.0.get().copied()
    }
}

/// Renders the operator-facing trace-view URL.
pub struct TraceViewUrlResolver {
    config: TraceViewConfig,
}

impl TraceViewUrlResolver {
    pub fn new(config: TraceViewConfig) -> Self {
        Self { config }
    }

    /// None unless a template or named viewer is configured.
    pub fn resolve(&self, trace_id: TraceId) -> Option<String> {
        let template = self.template()?;
        Some(template.replace(TRACE_ID_TOKEN, &trace_id.to_string()))
    }

    /// Named viewers expand the configured base URL with their known trace
    /// path; a raw URL is used as the template directly.
    fn template(&self) -> Option<String> {
        let url = self.config.url.as_deref()?;
        match self.config.viewer {
            Some(TraceViewType::Jaeger) => Some(join(url, "trace/{traceId}")),
            Some(TraceViewType::Zipkin) => Some(join(url, "zipkin/traces/{traceId}")),
            None => Some(url.to_string()),
        }
    }
}

fn join(base: &str, suffix: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), suffix)
}

/// The exact operator log line for a resolved trace-view URL.
pub fn trace_view_log_line(url: &str) -> String {
    format!("{SDK_NAME} build trace {url}")
}
