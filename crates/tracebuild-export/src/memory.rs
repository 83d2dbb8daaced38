//! In-memory exporter for tests: records every batch it receives.

use crate::gateway::SpanExporter;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracebuild_core::{ExportError, Span};

/// Cloneable handle; all clones share the same recorded span list.
#[derive(Clone, Default)]
pub struct InMemoryExporter {
    spans: Arc<Mutex<Vec<Span>>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything exported so far, in arrival order.
    pub fn exported(&self) -> Vec<Span> {
        self.spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl SpanExporter for InMemoryExporter {
    async fn export(&self, batch: &[Span]) -> Result<(), ExportError> {
        self.spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(batch);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
