//! Error types shared across the crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used by everything above the transport layer.
pub type Result<T> = std::result::Result<T, Hl7Error>;

/// Errors raised while building, encoding, persisting or sending a message.
#[derive(Error, Debug)]
pub enum Hl7Error {
    #[error("trigger event code must not be empty")]
    EmptyTriggerEvent,

    #[error("{0} message type is not supported; register a builder for it")]
    UnsupportedMessageType(String),

    #[error("invalid value for {segment}-{field}: {reason}")]
    FieldFormat {
        segment: &'static str,
        field: usize,
        reason: String,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Hl7Error {
    pub(crate) fn field_format(
        segment: &'static str,
        field: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::FieldFormat {
            segment,
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding(reason.into())
    }
}

/// Failures of a single MLLP round trip. None of these are retried here.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection to {endpoint} failed: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{endpoint} closed the connection without responding")]
    ConnectionClosed { endpoint: String },

    #[error("no complete response from {endpoint} within {after:?} ({stage})")]
    Timeout {
        endpoint: String,
        stage: &'static str,
        after: Duration,
    },

    #[error("malformed MLLP frame from {endpoint}: {reason}")]
    Framing { endpoint: String, reason: String },
}

/// Errors raised by the MLLP codec itself.
#[derive(Error, Debug)]
pub enum MllpError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Framing(String),
}
