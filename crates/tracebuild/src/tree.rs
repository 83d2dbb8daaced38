//! Span tree construction from lifecycle events.
//!
//! One builder per build run, driven through `Idle → Open → Closed`. The
//! root span is created on build start and closed on build finish; every
//! task gets a child span keyed by its task path. The tree is exactly two
//! levels deep.

use crate::enrich::{ATTR_ERROR_MESSAGE, ATTR_TASK_PATH};
use std::collections::HashMap;
use tracebuild_core::span::unix_nano_now;
use tracebuild_core::{
    Attributes, ObservationError, Span, SpanStatus, TaskOutcome, TraceId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildPhase {
    Idle,
    Open,
    Closed,
}

/// The in-flight trace of one build run: the root span plus the open child
/// span per task path.
#[derive(Debug)]
pub struct BuildTrace {
    pub trace_id: TraceId,
    pub root: Span,
    tasks: HashMap<String, Span>,
}

impl BuildTrace {
    pub fn open_task_count(&self) -> usize {
        self.tasks.len()
    }
}

/// Lifecycle state machine producing finished spans for export.
///
/// Not internally synchronized; the session wraps it in a `Mutex` so task
/// events may arrive from any worker thread. Correctness depends on the
/// task-path key, never on arrival order.
pub struct SpanTreeBuilder {
    phase: BuildPhase,
    trace: Option<BuildTrace>,
    failed_tasks: usize,
}

impl SpanTreeBuilder {
    pub fn new() -> Self {
        Self {
            phase: BuildPhase::Idle,
            trace: None,
            failed_tasks: 0,
        }
    }

    /// Open the root span. Valid only once, from `Idle`.
    pub fn on_build_start(
        &mut self,
        build_name: &str,
        attributes: Attributes,
    ) -> Result<TraceId, ObservationError> {
        match self.phase {
            BuildPhase::Idle => {}
            BuildPhase::Open => return Err(ObservationError::BuildAlreadyStarted),
            BuildPhase::Closed => return Err(ObservationError::BuildAlreadyFinished),
        }

        let trace_id = TraceId::generate();
        let mut root = Span::root(trace_id, build_name, unix_nano_now());
        root.attributes = attributes;

        self.trace = Some(BuildTrace {
            trace_id,
            root,
            tasks: HashMap::new(),
        });
        self.phase = BuildPhase::Open;
        Ok(trace_id)
    }

    /// Open a child span keyed by `task_path`.
    ///
    /// A second start for a path that already has an open span replaces it:
    /// the keyed map holds exactly one open span per path and the earlier
    /// start is dropped.
    pub fn on_task_start(
        &mut self,
        task_path: &str,
        attributes: Attributes,
    ) -> Result<(), ObservationError> {
        let trace = self.open_trace()?;

        let mut span = Span::child(
            trace.trace_id,
            trace.root.span_id,
            task_path,
            unix_nano_now(),
        );
        span.attributes = attributes;
        trace.tasks.insert(task_path.to_string(), span);
        Ok(())
    }

    /// Close the child span keyed by `task_path` and return it for export.
    ///
    /// A finish with no matching open span synthesizes a zero-duration span
    /// (carrying `fallback_attributes`) instead of failing the build.
    pub fn on_task_finish(
        &mut self,
        task_path: &str,
        outcome: TaskOutcome,
        failure_message: Option<&str>,
        fallback_attributes: Attributes,
    ) -> Result<Span, ObservationError> {
        let trace = self.open_trace()?;
        let now = unix_nano_now();

        let mut span = match trace.tasks.remove(task_path) {
            Some(span) => span,
            None => {
                // Finish without start: zero-duration recovery span.
                let mut span =
                    Span::child(trace.trace_id, trace.root.span_id, task_path, now);
                span.attributes = fallback_attributes;
                if span.attributes.get(ATTR_TASK_PATH).is_none() {
                    span.attributes.set(ATTR_TASK_PATH, task_path);
                }
                span
            }
        };

        let status = match outcome {
            TaskOutcome::Success => SpanStatus::Ok,
            TaskOutcome::Failure => {
                self.failed_tasks += 1;
                let message = failure_message.unwrap_or("task failed").to_string();
                span.attributes.set(ATTR_ERROR_MESSAGE, message.clone());
                SpanStatus::Error { message }
            }
        };
        span.close(now, status);
        Ok(span)
    }

    /// Seal the trace. Any still-open child is closed at the root's end
    /// instant; the root is returned last so it is the last span enqueued.
    pub fn on_build_finish(&mut self) -> Result<Vec<Span>, ObservationError> {
        self.open_trace()?;
        let trace = self
            .trace
            .take()
            .ok_or(ObservationError::BuildNotStarted)?;
        self.phase = BuildPhase::Closed;

        let end = unix_nano_now();
        let mut spans: Vec<Span> = Vec::with_capacity(trace.tasks.len() + 1);
        for (_, mut span) in trace.tasks {
            span.close(end, SpanStatus::Ok);
            spans.push(span);
        }

        let mut root = trace.root;
        let status = if self.failed_tasks > 0 {
            SpanStatus::Error {
                message: format!("{} task(s) failed", self.failed_tasks),
            }
        } else {
            SpanStatus::Ok
        };
        root.close(end, status);
        spans.push(root);
        Ok(spans)
    }

    pub fn trace_id(&self) -> Option<TraceId> {
        self.trace.as_ref().map(|t| t.trace_id)
    }

    pub fn trace(&self) -> Option<&BuildTrace> {
        self.trace.as_ref()
    }

    fn open_trace(&mut self) -> Result<&mut BuildTrace, ObservationError> {
        match self.phase {
            BuildPhase::Idle => Err(ObservationError::BuildNotStarted),
            BuildPhase::Closed => Err(ObservationError::BuildAlreadyFinished),
            BuildPhase::Open => self
                .trace
                .as_mut()
                .ok_or(ObservationError::BuildNotStarted),
        }
    }
}

impl Default for SpanTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> Attributes {
        Attributes::new()
    }

    #[test]
    fn test_happy_path_two_level_tree() {
        let mut builder = SpanTreeBuilder::new();
        let trace_id = builder.on_build_start("my-build", attrs()).unwrap();

        builder.on_task_start(":compile", attrs()).unwrap();
        builder.on_task_start(":test", attrs()).unwrap();

        let compile = builder
            .on_task_finish(":compile", TaskOutcome::Success, None, attrs())
            .unwrap();
        let test = builder
            .on_task_finish(":test", TaskOutcome::Success, None, attrs())
            .unwrap();
        let sealed = builder.on_build_finish().unwrap();

        let root = sealed.last().unwrap();
        assert!(root.is_root());
        assert_eq!(sealed.len(), 1);
        for child in [&compile, &test] {
            assert_eq!(child.trace_id, trace_id);
            assert_eq!(child.parent_span_id, Some(root.span_id));
            assert!(child.end_or_start() >= child.start_unix_nano);
            assert!(root.end_or_start() >= child.end_or_start());
        }
        assert_eq!(root.status, SpanStatus::Ok);
    }

    #[test]
    fn test_double_build_start_is_fatal() {
        let mut builder = SpanTreeBuilder::new();
        builder.on_build_start("b", attrs()).unwrap();
        assert_eq!(
            builder.on_build_start("b", attrs()),
            Err(ObservationError::BuildAlreadyStarted)
        );
    }

    #[test]
    fn test_events_before_start_rejected() {
        let mut builder = SpanTreeBuilder::new();
        assert_eq!(
            builder.on_task_start(":t", attrs()),
            Err(ObservationError::BuildNotStarted)
        );
        assert!(builder.on_build_finish().is_err());
    }

    #[test]
    fn test_finish_without_start_synthesizes_zero_duration_span() {
        let mut builder = SpanTreeBuilder::new();
        builder.on_build_start("b", attrs()).unwrap();

        let span = builder
            .on_task_finish(":ghost", TaskOutcome::Success, None, attrs())
            .unwrap();
        assert_eq!(span.end_unix_nano, Some(span.start_unix_nano));
        assert_eq!(
            span.attributes.get(ATTR_TASK_PATH),
            Some(&tracebuild_core::AttributeValue::Str(":ghost".into()))
        );
    }

    #[test]
    fn test_failed_task_marks_root_error() {
        let mut builder = SpanTreeBuilder::new();
        builder.on_build_start("b", attrs()).unwrap();
        builder.on_task_start(":test", attrs()).unwrap();

        let failed = builder
            .on_task_finish(
                ":test",
                TaskOutcome::Failure,
                Some("Assertion failed"),
                attrs(),
            )
            .unwrap();
        assert_eq!(
            failed.status,
            SpanStatus::Error { message: "Assertion failed".into() }
        );
        assert_eq!(
            failed.attributes.get(ATTR_ERROR_MESSAGE),
            Some(&tracebuild_core::AttributeValue::Str("Assertion failed".into()))
        );

        let sealed = builder.on_build_finish().unwrap();
        assert!(sealed.last().unwrap().status.is_error());
    }

    #[test]
    fn test_reexecuted_task_path_replaces_open_span() {
        let mut builder = SpanTreeBuilder::new();
        builder.on_build_start("b", attrs()).unwrap();

        builder.on_task_start(":t", attrs()).unwrap();
        let first_count = builder.trace().unwrap().open_task_count();
        builder.on_task_start(":t", attrs()).unwrap();
        assert_eq!(builder.trace().unwrap().open_task_count(), first_count);

        let span = builder
            .on_task_finish(":t", TaskOutcome::Success, None, attrs())
            .unwrap();
        assert_eq!(span.name, ":t");
        // Nothing left open for that path.
        assert_eq!(builder.trace().unwrap().open_task_count(), 0);
    }

    #[test]
    fn test_tasks_open_at_build_finish_are_closed_and_exported() {
        let mut builder = SpanTreeBuilder::new();
        builder.on_build_start("b", attrs()).unwrap();
        builder.on_task_start(":hung", attrs()).unwrap();

        let sealed = builder.on_build_finish().unwrap();
        assert_eq!(sealed.len(), 2);
        assert!(!sealed[0].is_root());
        assert!(sealed.last().unwrap().is_root());
        assert!(sealed[0].end_unix_nano.is_some());
    }

    #[test]
    fn test_events_after_finish_rejected() {
        let mut builder = SpanTreeBuilder::new();
        builder.on_build_start("b", attrs()).unwrap();
        builder.on_build_finish().unwrap();

        assert_eq!(
            builder.on_task_start(":t", attrs()),
            Err(ObservationError::BuildAlreadyFinished)
        );
        assert_eq!(
            builder.on_build_finish(),
            Err(ObservationError::BuildAlreadyFinished)
        );
    }
}
