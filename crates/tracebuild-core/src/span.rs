//! The span model: timed, attributed units of work with stable identities.

use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// 128-bit trace identifier shared by every span of one build run.
///
/// Rendered as 32 lowercase hex characters, matching the W3C trace-context
/// encoding used by trace viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    /// Generate a fresh random trace id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().as_u128())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Big-endian byte representation for binary wire formats.
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 64-bit span identifier, unique within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Generate a fresh random span id.
    pub fn generate() -> Self {
        let (high, _) = Uuid::new_v4().as_u64_pair();
        Self(high)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Big-endian byte representation for binary wire formats.
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl AttributeValue {
    /// String rendering used by wire formats whose tags are string-only.
    pub fn render(&self) -> String {
        match self {
            AttributeValue::Str(s) => s.clone(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Double(d) => d.to_string(),
            AttributeValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Insertion-ordered string-keyed attribute set.
///
/// Setting an existing key overwrites its value in place, which gives the
/// enrichment layer its later-wins merge semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Attributes(Vec<(String, AttributeValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<(String, AttributeValue)> for Attributes {
    fn extend<T: IntoIterator<Item = (String, AttributeValue)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

/// Terminal status of a span.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SpanStatus {
    #[default]
    Ok,
    Error {
        message: String,
    },
}

impl SpanStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error { .. })
    }
}

/// A timed, attributed unit of work.
///
/// `parent_span_id` is `None` only for the root span of a build run; every
/// other span points at the root, so the tree is exactly two levels deep.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub start_unix_nano: u64,
    /// Set once the span is closed; exported spans always carry it.
    pub end_unix_nano: Option<u64>,
    pub status: SpanStatus,
    pub attributes: Attributes,
}

impl Span {
    pub fn root(trace_id: TraceId, name: impl Into<String>, start_unix_nano: u64) -> Self {
        Self {
            trace_id,
            span_id: SpanId::generate(),
            parent_span_id: None,
            name: name.into(),
            start_unix_nano,
            end_unix_nano: None,
            status: SpanStatus::Ok,
            attributes: Attributes::new(),
        }
    }

    pub fn child(
        trace_id: TraceId,
        parent: SpanId,
        name: impl Into<String>,
        start_unix_nano: u64,
    ) -> Self {
        Self {
            trace_id,
            span_id: SpanId::generate(),
            parent_span_id: Some(parent),
            name: name.into(),
            start_unix_nano,
            end_unix_nano: None,
            status: SpanStatus::Ok,
            attributes: Attributes::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Close the span, clamping so `end >= start` always holds.
    pub fn close(&mut self, end_unix_nano: u64, status: SpanStatus) {
        self.end_unix_nano = Some(end_unix_nano.max(self.start_unix_nano));
        self.status = status;
    }

    /// End timestamp, falling back to the start for still-open spans.
    pub fn end_or_start(&self) -> u64 {
        self.end_unix_nano.unwrap_or(self.start_unix_nano)
    }
}

/// Current wall-clock time as nanoseconds since the unix epoch.
pub fn unix_nano_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
