//! Error types for Trainflow.
//!
//! All errors in Trainflow are represented by the `TrainflowError` enum,
//! which provides specific variants for different error categories.
//!
//! Validation findings (structural errors, warnings, suggestions) are not
//! errors in this sense: the validator always returns a report as data. A
//! `TrainflowError` is raised for malformed input, storage failures, and the
//! publish gate rejecting a flow.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Trainflow operations.
///
/// Each variant represents a specific category of error that can occur
/// during flow definition, session execution, or storage operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum TrainflowError {
    /// Engine-level errors (startup, shutdown, configuration).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON payloads, record mapping).
    #[error("{0}")]
    Convert(String),

    /// Malformed wire input rejected by the model layer.
    #[error("{0}")]
    Input(String),

    /// Flow definition errors.
    #[error("{0}")]
    Flow(String),

    /// Node definition errors (unknown kind, bad content payload).
    #[error("{0}")]
    Node(String),

    /// Edge definition errors (dangling endpoints, bad condition).
    #[error("{0}")]
    Edge(String),

    /// Session lifecycle errors.
    #[error("{0}")]
    Session(String),

    /// Publish gate rejections.
    #[error("{0}")]
    Publish(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<TrainflowError> for String {
    fn from(val: TrainflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for TrainflowError {
    fn from(error: std::io::Error) -> Self {
        TrainflowError::IoError(error.to_string())
    }
}

impl From<TrainflowError> for std::io::Error {
    fn from(val: TrainflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for TrainflowError {
    fn from(error: serde_json::Error) -> Self {
        TrainflowError::Convert(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for TrainflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        TrainflowError::Input(error.to_string())
    }
}
