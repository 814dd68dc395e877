//! Telemetry errors.

use thiserror::Error;

/// Errors raised while installing or feeding telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive does not parse.
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global `tracing` subscriber could not be installed.
    #[error("cannot install log subscriber: {0}")]
    Subscriber(String),

    /// The histogram buckets were rejected.
    #[error("invalid duration buckets: {0}")]
    Buckets(String),

    /// The Prometheus recorder could not be installed.
    #[error("cannot install metrics recorder: {0}")]
    Recorder(String),

    /// An event could not be serialized.
    #[error("cannot encode telemetry event: {0}")]
    Encode(#[from] serde_json::Error),

    /// A sink rejected an event.
    #[error("telemetry sink failed: {0}")]
    Sink(String),
}

impl TelemetryError {
    /// True when the failure came from installing a global hook rather than
    /// from bad input.
    #[must_use]
    pub fn is_install_failure(&self) -> bool {
        matches!(self, Self::Subscriber(_) | Self::Recorder(_))
    }
}
