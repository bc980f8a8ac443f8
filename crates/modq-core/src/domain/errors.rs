//! Errors - エラー型と分類
//!
//! Every collaborator fails through its own `thiserror` enum. The worker only
//! ever looks at the closed [`ErrorKind`] tag, which is what ends up in the
//! `error` field of a dead-letter record.

use std::fmt;

use thiserror::Error;

use super::ids::{ItemId, TaskId};

/// ErrorKind は実行エラーの分類
///
/// - NotFound: the referenced item or task does not exist. Retrying cannot fix
///   it, but it still consumes a retry slot.
/// - BackendUnavailable: the scoring backend is not loaded.
/// - PredictionFault: generic scoring error.
/// - TransportFault: queue connect/send/commit failure. Never absorbed by the
///   retry loop; it terminates the run loop.
/// - Unclassified: anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    BackendUnavailable,
    PredictionFault,
    TransportFault,
    Unclassified,
}

impl ErrorKind {
    /// Stable name written to the dead-letter topic.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::BackendUnavailable => "BackendUnavailable",
            ErrorKind::PredictionFault => "PredictionFault",
            ErrorKind::TransportFault => "TransportFault",
            ErrorKind::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failures of the prediction service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("item {0} not found")]
    NotFound(ItemId),

    #[error("scoring backend unavailable: {0}")]
    Unavailable(String),

    #[error("prediction failed: {0}")]
    Fault(String),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::NotFound(_) => ErrorKind::NotFound,
            PredictionError::Unavailable(_) => ErrorKind::BackendUnavailable,
            PredictionError::Fault(_) => ErrorKind::PredictionFault,
        }
    }
}

/// Failures of the moderation store (and the advertisement catalog).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("moderation task {0} not found")]
    NotFound(TaskId),

    #[error("storage failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Backend(_) => ErrorKind::Unclassified,
        }
    }
}

/// Envelope encode/decode failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid ISO-8601 timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Message queue failures. Always fatal to the run loop.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not started")]
    NotConnected,

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("failed to send to topic '{topic}': {reason}")]
    Send { topic: String, reason: String },

    #[error("failed to receive: {0}")]
    Receive(String),

    #[error("failed to commit offset: {0}")]
    Commit(String),

    #[error("failed to encode record: {0}")]
    Encode(#[from] CodecError),
}

/// Everything that can go wrong while handling one moderation request.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ModerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModerationError::Prediction(e) => e.kind(),
            ModerationError::Store(e) => e.kind(),
            ModerationError::Transport(_) => ErrorKind::TransportFault,
            ModerationError::Codec(_) => ErrorKind::Unclassified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::item_missing(PredictionError::NotFound(ItemId::new(1)).into(), ErrorKind::NotFound)]
    #[case::model_not_loaded(PredictionError::Unavailable("no model".into()).into(), ErrorKind::BackendUnavailable)]
    #[case::scoring_fault(PredictionError::Fault("nan".into()).into(), ErrorKind::PredictionFault)]
    #[case::task_missing(StoreError::NotFound(TaskId::new(1)).into(), ErrorKind::NotFound)]
    #[case::store_backend(StoreError::Backend("disk".into()).into(), ErrorKind::Unclassified)]
    #[case::transport(TransportError::NotConnected.into(), ErrorKind::TransportFault)]
    fn every_collaborator_fault_maps_to_one_kind(
        #[case] error: ModerationError,
        #[case] expected: ErrorKind,
    ) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(ErrorKind::NotFound.to_string(), "NotFound");
        assert_eq!(ErrorKind::BackendUnavailable.name(), "BackendUnavailable");
        assert_eq!(ErrorKind::PredictionFault.name(), "PredictionFault");
        assert_eq!(ErrorKind::TransportFault.name(), "TransportFault");
        assert_eq!(ErrorKind::Unclassified.name(), "Unclassified");
    }

    #[test]
    fn moderation_error_keeps_collaborator_message() {
        let err: ModerationError = PredictionError::NotFound(ItemId::new(999)).into();
        assert_eq!(err.to_string(), "item item-999 not found");
    }
}
