//! The per-run telemetry session.
//!
//! Replaces a process-wide SDK singleton with an explicitly owned context:
//! created at build start, torn down exactly once via the drain step. The
//! session owns a dedicated runtime so the exporter's network resources are
//! scoped to the run — acquired in `new`, released on drop, strictly after
//! the drain.

use crate::batch::BatchQueue;
use crate::enrich::AttributeEnricher;
use crate::tree::SpanTreeBuilder;
use crate::view::{trace_view_log_line, TraceIdTracker, TraceViewUrlResolver};
use std::sync::Mutex;
use std::time::Duration;
use tracebuild_core::{
    BuildEvent, ConfigError, ObservationError, TelemetryConfig, TraceId,
};
use tracebuild_export::{ExporterGateway, SpanExporter};
use tracing::{debug, info, warn};

pub struct BuildTelemetry {
    tree: Mutex<SpanTreeBuilder>,
    enricher: AttributeEnricher,
    queue: BatchQueue,
    tracker: TraceIdTracker,
    resolver: TraceViewUrlResolver,
    drain_timeout: Duration,
    // Declared last: the queue sender must drop first so the worker can
    // wind down before the runtime is torn down.
    _runtime: tokio::runtime::Runtime,
}

impl BuildTelemetry {
    /// Validate the configuration and acquire exporter resources.
    ///
    /// Fails only on configuration errors, before any lifecycle event is
    /// processed; an unreachable collector is not detected here (transports
    /// connect lazily) and never fails the build.
    pub fn new(config: TelemetryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let gateway = ExporterGateway::from_config(&config.exporter)?;
        Self::build(config, gateway)
    }

    /// Construct with a caller-supplied exporter instead of the configured
    /// wire protocol.
    pub fn with_exporter(
        config: TelemetryConfig,
        exporter: Box<dyn SpanExporter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::build(config, ExporterGateway::with_exporter(exporter))
    }

    fn build(config: TelemetryConfig, gateway: ExporterGateway) -> Result<Self, ConfigError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("tracebuild-export")
            .enable_all()
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        let queue = BatchQueue::start(runtime.handle(), gateway, config.exporter.batch_delay());

        Ok(Self {
            tree: Mutex::new(SpanTreeBuilder::new()),
            enricher: AttributeEnricher::new(&config),
            queue,
            tracker: TraceIdTracker::new(),
            resolver: TraceViewUrlResolver::new(config.trace_view.clone()),
            drain_timeout: config.drain_timeout(),
            _runtime: runtime,
        })
    }

    /// Process one lifecycle event. Safe to call from any thread.
    ///
    /// Returns an error only for build-level usage mistakes (double start,
    /// finish before start). Task-level sequencing surprises are recovered
    /// locally and never fail the build.
    pub fn handle(&self, event: BuildEvent) -> Result<(), ObservationError> {
        match event {
            BuildEvent::BuildStarted { build_name } => {
                let trace_id = self
                    .lock_tree()
                    .on_build_start(&build_name, self.enricher.root_attributes())?;
                self.tracker.record(trace_id);
                debug!(%trace_id, build_name, "build trace opened");
                Ok(())
            }
            BuildEvent::TaskStarted { task_path, task_type } => {
                let attrs = self.enricher.task_attributes(&task_path, Some(&task_type));
                if let Err(error) = self.lock_tree().on_task_start(&task_path, attrs) {
                    debug!(task_path, %error, "ignoring task start");
                }
                Ok(())
            }
            BuildEvent::TaskFinished { task_path, outcome, failure_message } => {
                let fallback = self.enricher.task_attributes(&task_path, None);
                let result = self.lock_tree().on_task_finish(
                    &task_path,
                    outcome,
                    failure_message.as_deref(),
                    fallback,
                );
                match result {
                    Ok(span) => self.queue.record(span),
                    Err(error) => debug!(task_path, %error, "ignoring task finish"),
                }
                Ok(())
            }
            BuildEvent::BuildFinished => self.finish(),
        }
    }

    /// Trace id of the current run, once the build has started.
    pub fn trace_id(&self) -> Option<TraceId> {
        self.tracker.get()
    }

    /// The operator-facing trace-view URL, if one is configured and the
    /// build has started.
    pub fn trace_view_url(&self) -> Option<String> {
        self.resolver.resolve(self.tracker.get()?)
    }

    fn finish(&self) -> Result<(), ObservationError> {
        let spans = self.lock_tree().on_build_finish()?;
        // Children first, root strictly last.
        for span in spans {
            self.queue.record(span);
        }

        if !self.queue.drain(self.drain_timeout) {
            warn!(
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "span drain timed out; remaining telemetry dropped"
            );
        }

        if let Some(url) = self.trace_view_url() {
            info!("{}", trace_view_log_line(&url));
        }
        Ok(())
    }

    fn lock_tree(&self) -> std::sync::MutexGuard<'_, SpanTreeBuilder> {
        self.tree
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
