//! Integration test infrastructure for tracebuild.
//!
//! The session owns its tokio runtime and blocks on the drain at build
//! finish, so tests drive it on a blocking thread while wiremock runs on
//! the test runtime.

use tracebuild::{BuildEvent, BuildTelemetry};
use tracebuild_core::{ExporterConfig, ExporterMode, TelemetryConfig};

mod grpc_mock;

pub use grpc_mock::{MockTraceCollector, RecordedExport};

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,tracebuild=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Telemetry config pointed at a test endpoint, with fast timeouts.
pub fn test_config(endpoint: &str, mode: ExporterMode) -> TelemetryConfig {
    let mut exporter = ExporterConfig::new(endpoint, mode);
    exporter.connect_timeout_ms = 500;
    exporter.batch_delay_ms = 50;
    let mut config = TelemetryConfig::new("itest-build", exporter);
    config.drain_timeout_ms = 5_000;
    config
}

/// The canonical observed build: two passing tasks.
pub fn passing_build_events() -> Vec<BuildEvent> {
    vec![
        BuildEvent::BuildStarted { build_name: "itest-build".into() },
        BuildEvent::task_started(":compile", "Compile"),
        BuildEvent::task_started(":test", "Test"),
        BuildEvent::task_succeeded(":compile"),
        BuildEvent::task_succeeded(":test"),
        BuildEvent::BuildFinished,
    ]
}

/// An observed build with one failing task.
pub fn failing_build_events(failure_message: &str) -> Vec<BuildEvent> {
    vec![
        BuildEvent::BuildStarted { build_name: "itest-build".into() },
        BuildEvent::task_started(":test", "Test"),
        BuildEvent::task_failed(":test", failure_message),
        BuildEvent::BuildFinished,
    ]
}

/// Run a full session over the given events on a blocking thread and tear
/// it down (drain included) before returning.
pub async fn run_events(
    config: TelemetryConfig,
    events: Vec<BuildEvent>,
) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let session = BuildTelemetry::new(config)?;
        for event in events {
            session.handle(event)?;
        }
        Ok(())
    })
    .await?
}

/// All request bodies received by a wiremock server, concatenated as utf-8.
pub async fn combined_bodies(server: &wiremock::MockServer) -> String {
    let requests = server.received_requests().await.unwrap_or_default();
    requests
        .iter()
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}
