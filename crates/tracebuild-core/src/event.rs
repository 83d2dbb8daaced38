//! Build lifecycle events.
//!
//! The span-building core consumes this tagged event type instead of any
//! host-specific listener API, so any build engine that can report these
//! four notifications can be observed.

use serde::{Deserialize, Serialize};

/// Outcome of a finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Success,
    Failure,
}

/// A lifecycle notification from the host build engine.
///
/// Task events may arrive from multiple worker threads concurrently;
/// correctness depends on the task path key, not on arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildEvent {
    BuildStarted {
        build_name: String,
    },
    TaskStarted {
        task_path: String,
        task_type: String,
    },
    TaskFinished {
        task_path: String,
        outcome: TaskOutcome,
        failure_message: Option<String>,
    },
    BuildFinished,
}

impl BuildEvent {
    pub fn task_started(path: impl Into<String>, task_type: impl Into<String>) -> Self {
        BuildEvent::TaskStarted {
            task_path: path.into(),
            task_type: task_type.into(),
        }
    }

    pub fn task_succeeded(path: impl Into<String>) -> Self {
        BuildEvent::TaskFinished {
            task_path: path.into(),
            outcome: TaskOutcome::Success,
            failure_message: None,
        }
    }

    pub fn task_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        BuildEvent::TaskFinished {
            task_path: path.into(),
            outcome: TaskOutcome::Failure,
            failure_message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = BuildEvent::task_failed(":test", "Assertion failed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_finished");
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["failure_message"], "Assertion failed");
    }
}
