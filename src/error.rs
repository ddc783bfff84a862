use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Sink operation that failed, carried by [`LoggerError::Sink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOperation {
    Reset,
    Open,
    Write,
    Close,
}

impl std::fmt::Display for SinkOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkOperation::Reset => write!(f, "reset"),
            SinkOperation::Open => write!(f, "open"),
            SinkOperation::Write => write!(f, "write"),
            SinkOperation::Close => write!(f, "close"),
        }
    }
}

/// Errors raised by the buffering core and its sinks.
///
/// Only construction-time problems ever reach a caller. Sink failures are
/// recovered inside the drain worker and surface through its failure hook.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("ring buffer capacity must be at least 1 (got {0})")]
    InvalidCapacity(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("sink {operation} failed: {source}")]
    Sink {
        operation: SinkOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn drain worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl LoggerError {
    pub(crate) fn sink(operation: SinkOperation, source: std::io::Error) -> Self {
        LoggerError::Sink { operation, source }
    }
}
