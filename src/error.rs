//! Typed failures that callers match on.
//!
//! Everything else propagates as `anyhow::Error`.

use thiserror::Error;

/// Failure of a request to the background service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("background did not answer in time")]
    Timeout,
    /// The receiving end is gone. Content-side callers treat this as benign.
    #[error("receiving end does not exist")]
    Disconnected,
    #[error("Unknown message type")]
    UnknownMessage(String),
    #[error("invalid message payload: {0}")]
    InvalidPayload(String),
    #[error("{0}")]
    Internal(String),
}

impl From<anyhow::Error> for MessageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Failure of an Interaction Log storage operation. The record is dropped.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("storage {op} timed out after {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: u64 },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// A highlight marker could not be inserted at a candidate position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapError {
    #[error("node {0} is not a text node")]
    NotText(usize),
    #[error("range {start}..{end} is outside the text node")]
    OutOfBounds { start: usize, end: usize },
    #[error("cannot wrap text inside <{0}>")]
    Rejected(String),
}

impl From<LogError> for MessageError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Timeout { .. } => Self::Timeout,
            LogError::Storage(e) => Self::Internal(format!("{e:#}")),
        }
    }
}
