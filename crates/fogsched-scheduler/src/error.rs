//! Scheduler error types.

use thiserror::Error;

use fogsched_placement::PlacementError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// No node was UP at decision time. Surfaced to the caller as-is;
    /// retrying is the caller's decision.
    #[error("No active fog nodes available")]
    NoAvailableNode,

    #[error("placement error: {0}")]
    Placement(PlacementError),
}

impl From<PlacementError> for SchedulerError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::NoAvailableNode => SchedulerError::NoAvailableNode,
            other => SchedulerError::Placement(other),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
