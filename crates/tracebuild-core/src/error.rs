//! Error taxonomy for tracebuild.
//!
//! Three families with very different blast radii:
//! - [`ConfigError`] is fatal and surfaces before any lifecycle event is
//!   processed.
//! - [`ExportError`] is caught at the exporter gateway, logged, and never
//!   propagates into the observed build's outcome.
//! - [`ObservationError`] covers lifecycle sequencing mistakes; where the
//!   pipeline can recover locally (e.g. a finish without a start) it does so
//!   instead of returning one of these.

use thiserror::Error;

/// Invalid configuration detected at session construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid exporter endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("Invalid header value for '{0}'")]
    InvalidHeaderValue(String),

    #[error("Service name must not be empty")]
    EmptyServiceName,

    #[error("Failed to build transport client: {0}")]
    Transport(String),
}

/// Failure while transmitting a span batch.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("export call timed out")]
    Timeout,

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Unexpected lifecycle sequencing from the host build engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObservationError {
    #[error("Build already started; onBuildStart may only be called once per run")]
    BuildAlreadyStarted,

    #[error("Build not started; event received while idle")]
    BuildNotStarted,

    #[error("Build already finished; event received after the root span closed")]
    BuildAlreadyFinished,
}
