//! Error types for the status store.

use thiserror::Error;

/// Result type alias for status store operations.
pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("node pool must contain at least one node")]
    EmptyPool,

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),
}
