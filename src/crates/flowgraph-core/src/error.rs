//! Error types for graph construction and execution
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── Validation      - Graph structure errors caught at compile time
//! ├── Configuration   - A router returned an undeclared branch key
//! ├── NodeExecution   - A node executor returned an error
//! └── Execution       - General execution errors (step limit, missing edge)
//! ```
//!
//! Only `Configuration` is expected during a run of a well-formed workflow
//! whose nodes absorb their own failures: it marks a wiring defect, not a
//! data condition, and it stops execution immediately.

use thiserror::Error;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Boxed error type returned by node executors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during graph construction or execution.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph structure is invalid (missing nodes, dangling edges).
    ///
    /// Returned by [`Graph::validate`](crate::graph::Graph::validate) and by
    /// [`StateGraph::compile`](crate::builder::StateGraph::compile).
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// A condition function returned a branch key that was never declared
    /// for its source node.
    ///
    /// This is a structural contract violation, not a runtime data error:
    /// the set of legal successors is fixed when the graph is defined, so an
    /// unknown key means the router and the branch map disagree. Execution
    /// stops immediately.
    #[error("node '{node}' routed to undeclared branch '{branch}'")]
    Configuration {
        /// Node whose condition function misbehaved.
        node: String,
        /// The key the condition function returned.
        branch: String,
    },

    /// A node executor returned an error.
    #[error("node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Node that failed.
        node: String,
        /// Error description from the executor.
        error: String,
    },

    /// General execution failure.
    #[error("execution failed: {0}")]
    Execution(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::Configuration {
            node: "validator".to_string(),
            branch: "retry".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "node 'validator' routed to undeclared branch 'retry'"
        );
    }

    #[test]
    fn test_node_execution_display() {
        let err = GraphError::NodeExecution {
            node: "planner".to_string(),
            error: "boom".to_string(),
        };
        assert!(err.to_string().contains("planner"));
        assert!(err.to_string().contains("boom"));
    }
}
