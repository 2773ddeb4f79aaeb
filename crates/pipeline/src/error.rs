//! Pipeline error types

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A route names a sink absent from the registry
    #[error("sink '{0}' not registered")]
    UnknownSink(String),

    /// Duplicate sink name during registry construction
    #[error("duplicate sink name '{0}'")]
    DuplicateSink(String),

    /// Routing map construction failed
    #[error(transparent)]
    Routing(#[from] courier_routing::RoutingError),

    /// Pipeline is shutting down
    #[error("pipeline is shutting down")]
    ShuttingDown,
}
