//! Wire-level OTLP/gRPC export against an in-process collector.

use opentelemetry_proto::tonic::trace::v1::status::StatusCode;
use tracebuild_core::{user_agent, ExporterMode};
use tracebuild_tests::{
    failing_build_events, init_test_logging, passing_build_events, run_events, test_config,
    MockTraceCollector,
};

#[tokio::test]
async fn test_grpc_export_delivers_the_span_tree() {
    init_test_logging();
    let collector = MockTraceCollector::start().await.unwrap();

    let config = test_config(collector.uri(), ExporterMode::Grpc);
    run_events(config, passing_build_events()).await.unwrap();

    let spans = collector.spans();
    assert_eq!(spans.len(), 3, "expected root plus two task spans");

    let names: Vec<&str> = spans.iter().map(|span| span.name.as_str()).collect();
    for expected in ["itest-build", ":compile", ":test"] {
        assert!(names.contains(&expected), "missing span {expected}");
    }

    let roots: Vec<_> = spans
        .iter()
        .filter(|span| span.parent_span_id.is_empty())
        .collect();
    assert_eq!(roots.len(), 1, "expected exactly one root span");
    let root = roots[0];
    assert_eq!(root.name, "itest-build");

    for child in spans.iter().filter(|span| !span.parent_span_id.is_empty()) {
        assert_eq!(child.parent_span_id, root.span_id);
        assert_eq!(child.trace_id, root.trace_id);
        assert!(child.end_time_unix_nano <= root.end_time_unix_nano);
    }
}

#[tokio::test]
async fn test_grpc_requests_carry_identity_and_custom_metadata() {
    init_test_logging();
    let collector = MockTraceCollector::start().await.unwrap();

    let mut config = test_config(collector.uri(), ExporterMode::Grpc);
    config.exporter.headers = vec![("foo1".into(), "bar1".into())];
    run_events(config, passing_build_events()).await.unwrap();

    let exports = collector.exports();
    assert!(!exports.is_empty());
    for export in &exports {
        let ua = export
            .metadata
            .get("user-agent")
            .expect("user-agent metadata missing")
            .to_str()
            .unwrap();
        assert!(
            ua.starts_with(&user_agent()),
            "unexpected user-agent: {ua}"
        );
        assert_eq!(export.metadata.get("foo1").unwrap(), "bar1");
    }
}

#[tokio::test]
async fn test_grpc_export_preserves_failure_status() {
    init_test_logging();
    let collector = MockTraceCollector::start().await.unwrap();

    let config = test_config(collector.uri(), ExporterMode::Grpc);
    run_events(config, failing_build_events("Assertion failed"))
        .await
        .unwrap();

    let spans = collector.spans();
    let failed = spans
        .iter()
        .find(|span| span.name == ":test")
        .expect("failed task span missing");
    let status = failed.status.as_ref().expect("status missing");
    assert_eq!(status.code, StatusCode::Error as i32);
    assert_eq!(status.message, "Assertion failed");

    let error_messages: Vec<&str> = failed
        .attributes
        .iter()
        .filter(|kv| kv.key == "error.message")
        .filter_map(|kv| kv.value.as_ref())
        .filter_map(|value| match value.value.as_ref() {
            Some(opentelemetry_proto::tonic::common::v1::any_value::Value::StringValue(s)) => {
                Some(s.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(error_messages, vec!["Assertion failed"]);
}
