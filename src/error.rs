use thiserror::Error;

/// Failure conditions raised by the graph algorithms.
///
/// Public operations return `anyhow::Result`; the underlying condition can be
/// recovered with `err.downcast_ref::<GraphError>()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Source vertex index should be non-negative, got {0}")]
    NegativeSourceVertex(i64),

    #[error("Source vertex index {source_vertex} is out of range for a graph with {vertex_count} vertices")]
    SourceVertexOutOfRange {
        source_vertex: i64,
        vertex_count: usize,
    },

    #[error("Delta should be positive")]
    NonPositiveDelta,

    #[error("At least one optional result (distances or predecessors) must be requested")]
    NoOptionalResults,

    #[error("Edge weights should be non-negative, found a negative weight on edge ({0}, {1})")]
    NegativeEdgeWeight(u32, u32),

    #[error("Target graph is empty")]
    EmptyTargetGraph,

    #[error("Pattern graph is empty")]
    EmptyPatternGraph,

    #[error("Target graph has {target} vertices, fewer than the {pattern} vertices of the pattern graph")]
    TargetSmallerThanPattern { target: usize, pattern: usize },

    #[error("Max match count should be non-negative, got {0}")]
    NegativeMaxMatchCount(i64),

    #[error("Range [{begin}, {end}) is invalid for a graph with {vertex_count} vertices")]
    InvalidRange {
        begin: usize,
        end: usize,
        vertex_count: usize,
    },

    #[error("Algorithm requires an undirected graph")]
    DirectedGraphNotSupported,

    #[error("Optional result '{0}' was not requested and is uninitialized")]
    UninitializedOptionalResult(&'static str),

    #[error("Failed to allocate memory for {0}")]
    BadAllocation(&'static str),
}

impl GraphError {
    /// True for every precondition violation, false for access and allocation failures.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(
            self,
            GraphError::UninitializedOptionalResult(_) | GraphError::BadAllocation(_)
        )
    }
}

/// Pulls the `GraphError` out of an `anyhow::Error`, if that is what it carries.
pub fn graph_error(err: &anyhow::Error) -> Option<&GraphError> {
    err.downcast_ref::<GraphError>()
}
