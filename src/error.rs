use std::collections::TryReserveError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, CarparkError>;

/// Errors surfaced by the carpark buffer and the actor graph.
#[derive(Debug, Error)]
pub enum CarparkError {
    /// Capacity must be a positive number of slots.
    #[error("invalid carpark capacity: {0}, must be at least 1")]
    InvalidCapacity(usize),
    /// The slot storage could not be allocated.
    #[error("unable to allocate {capacity} slots: {source}")]
    Allocation {
        capacity: usize,
        #[source]
        source: TryReserveError,
    },
    /// The buffer was closed while waiting, or before the call.
    #[error("carpark is closed")]
    Closed,
    #[error("unable to spawn actor thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// Some actors were still running when the stop timeout expired.
    #[error("actors did not stop in time: {0:?}")]
    ShutdownTimeout(Vec<String>),
    #[error("actor {0} panicked")]
    ActorPanicked(String),
}

impl CarparkError {
    /// Closed is the expected outcome of a shutdown, not a failure.
    pub fn is_closed(&self) -> bool {
        matches!(self, CarparkError::Closed)
    }
}
