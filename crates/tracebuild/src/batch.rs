//! Batch queue between span creation and the exporter gateway.
//!
//! Finished spans are handed to a background worker over an unbounded
//! channel; the worker coalesces them and flushes on a fixed schedule so
//! bursts of short-task spans share one network call. Producers never block
//! on a flush.

use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracebuild_core::Span;
use tracebuild_export::ExporterGateway;
use tracing::debug;

enum Command {
    Record(Span),
    /// Flush everything already queued, then ack.
    Drain(std_mpsc::SyncSender<()>),
}

/// Handle to the batch worker; one per build run.
pub struct BatchQueue {
    tx: mpsc::UnboundedSender<Command>,
}

impl BatchQueue {
    /// Spawn the worker on the given runtime.
    pub fn start(
        handle: &tokio::runtime::Handle,
        gateway: ExporterGateway,
        flush_delay: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(run_worker(rx, gateway, flush_delay));
        Self { tx }
    }

    /// Enqueue a finished span. Never blocks.
    pub fn record(&self, span: Span) {
        if self.tx.send(Command::Record(span)).is_err() {
            debug!("batch worker stopped; span dropped");
        }
    }

    /// Block until every span enqueued before this call has been handed to
    /// the gateway and the final flush returned, or until `timeout` expires.
    /// Returns `false` on timeout; remaining telemetry is then dropped.
    pub fn drain(&self, timeout: Duration) -> bool {
        let (ack_tx, ack_rx) = std_mpsc::sync_channel(1);
        if self.tx.send(Command::Drain(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv_timeout(timeout).is_ok()
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Command>,
    gateway: ExporterGateway,
    flush_delay: Duration,
) {
    let mut interval = tokio::time::interval(flush_delay);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut buffer: Vec<Span> = Vec::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !buffer.is_empty() {
                    gateway.dispatch(std::mem::take(&mut buffer)).await;
                }
            }
            command = rx.recv() => match command {
                Some(Command::Record(span)) => buffer.push(span),
                Some(Command::Drain(ack)) => {
                    // Channel FIFO: every span recorded before the drain
                    // request is already in the buffer at this point.
                    gateway.dispatch(std::mem::take(&mut buffer)).await;
                    let _ = ack.send(());
                }
                None => {
                    gateway.dispatch(std::mem::take(&mut buffer)).await;
                    break;
                }
            }
        }
    }
}
