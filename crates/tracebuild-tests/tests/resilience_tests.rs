//! Transport failures must never change the observed build's own outcome.

use tracebuild_core::ExporterMode;
use tracebuild_tests::{init_test_logging, passing_build_events, run_events, test_config};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_unreachable_endpoint_does_not_fail_the_build() {
    init_test_logging();
    // Nothing listens here; connections are refused.
    for mode in [ExporterMode::Http, ExporterMode::Zipkin, ExporterMode::Grpc] {
        let mut config = test_config("http://127.0.0.1:9/otel", mode);
        config.drain_timeout_ms = 3_000;
        run_events(config, passing_build_events())
            .await
            .expect("telemetry failure leaked into the build outcome");
    }
}

#[tokio::test]
async fn test_server_error_response_does_not_fail_the_build() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(&format!("{}/otel", server.uri()), ExporterMode::Http);
    run_events(config, passing_build_events())
        .await
        .expect("non-2xx response leaked into the build outcome");

    // The collector did receive the attempts; they were just rejected.
    assert!(!server.received_requests().await.unwrap().is_empty());
}
