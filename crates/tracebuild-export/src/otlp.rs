//! Translation from the internal span model into the typed OTLP export
//! request shared by the gRPC and HTTP adapters.

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{span, status, ResourceSpans, ScopeSpans, Status};
use tracebuild_core::{AttributeValue, Span, SpanStatus, SDK_NAME, SDK_VERSION};

/// Build the export request for one batch.
///
/// Resource attributes live on the root span in this model, so the wire
/// resource stays empty and the instrumentation scope carries the SDK
/// identity.
pub fn encode_request(batch: &[Span]) -> ExportTraceServiceRequest {
    let spans = batch.iter().map(encode_span).collect();
    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource::default()),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope {
                    name: SDK_NAME.to_string(),
                    version: SDK_VERSION.to_string(),
                    ..Default::default()
                }),
                spans,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

fn encode_span(span: &Span) -> opentelemetry_proto::tonic::trace::v1::Span {
    opentelemetry_proto::tonic::trace::v1::Span {
        trace_id: span.trace_id.to_bytes().to_vec(),
        span_id: span.span_id.to_bytes().to_vec(),
        parent_span_id: span
            .parent_span_id
            .map(|id| id.to_bytes().to_vec())
            .unwrap_or_default(),
        name: span.name.clone(),
        kind: span::SpanKind::Internal as i32,
        start_time_unix_nano: span.start_unix_nano,
        end_time_unix_nano: span.end_or_start(),
        attributes: span
            .attributes
            .iter()
            .map(|(key, value)| KeyValue {
                key: key.to_string(),
                value: Some(encode_value(value)),
            })
            .collect(),
        status: Some(encode_status(&span.status)),
        ..Default::default()
    }
}

fn encode_value(value: &AttributeValue) -> AnyValue {
    let value = match value {
        AttributeValue::Str(s) => any_value::Value::StringValue(s.clone()),
        AttributeValue::Int(i) => any_value::Value::IntValue(*i),
        AttributeValue::Double(d) => any_value::Value::DoubleValue(*d),
        AttributeValue::Bool(b) => any_value::Value::BoolValue(*b),
    };
    AnyValue { value: Some(value) }
}

fn encode_status(status: &SpanStatus) -> Status {
    match status {
        SpanStatus::Ok => Status {
            message: String::new(),
            code: status::StatusCode::Ok as i32,
        },
        SpanStatus::Error { message } => Status {
            message: message.clone(),
            code: status::StatusCode::Error as i32,
        },
    }
}
