//! StateGraph builder API for constructing workflows
//!
//! [`StateGraph`] is the primary way to define a workflow: add nodes, wire
//! edges (direct or conditional), then [`compile`](StateGraph::compile) into
//! an executable [`CompiledGraph`](crate::CompiledGraph). Compilation
//! validates the structure, so wiring mistakes surface before the first run
//! rather than in the middle of one.
//!
//! # Quick Start
//!
//! ```rust
//! use flowgraph_core::{StateGraph, FlowState};
//!
//! #[derive(Clone, Default)]
//! struct Counter {
//!     value: i64,
//!     visited: Vec<String>,
//! }
//!
//! impl FlowState for Counter {
//!     fn record_visit(&mut self, node: &str) {
//!         self.visited.push(node.to_string());
//!     }
//! }
//!
//! # async fn example() -> Result<(), flowgraph_core::GraphError> {
//! let mut graph = StateGraph::new();
//!
//! graph.add_node("increment", |mut state: Counter| {
//!     Box::pin(async move {
//!         state.value += 1;
//!         Ok(state)
//!     })
//! });
//!
//! graph.set_entry("increment");
//! graph.add_finish("increment");
//!
//! let compiled = graph.compile()?;
//! let final_state = compiled.invoke(Counter::default()).await?;
//! assert_eq!(final_state.value, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Conditional Routing
//!
//! A conditional edge pairs a condition function with a closed map of
//! branches. The function returns a branch *key*; the map names the node
//! each key leads to. Keys not present in the map are rejected at runtime
//! with a [`Configuration`](crate::GraphError::Configuration) error.
//!
//! ```rust,no_run
//! # use flowgraph_core::{StateGraph, FlowState, END};
//! # use std::collections::HashMap;
//! # #[derive(Clone)] struct S { done: bool }
//! # impl FlowState for S { fn record_visit(&mut self, _: &str) {} }
//! # let mut graph: StateGraph<S> = StateGraph::new();
//! graph.add_conditional_edge(
//!     "check",
//!     |state: &S| if state.done { "end" } else { "work" }.to_string(),
//!     HashMap::from([
//!         ("end".to_string(), END.to_string()),
//!         ("work".to_string(), "work".to_string()),
//!     ]),
//! );
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::engine::CompiledGraph;
use crate::error::{BoxError, GraphError, Result};
use crate::graph::{Graph, NodeId, NodeSpec, END, START};
use crate::FlowState;

/// Builder for workflow graphs.
///
/// Collects nodes and edges, then compiles into a
/// [`CompiledGraph`](crate::CompiledGraph). See the [module docs](self) for
/// usage.
pub struct StateGraph<S> {
    graph: Graph<S>,
}

impl<S: FlowState> StateGraph<S> {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self { graph: Graph::new() }
    }

    /// Add a processing node.
    ///
    /// The executor consumes the state and returns the updated state. Node
    /// ids must be unique; re-adding an id replaces the previous executor.
    pub fn add_node<F>(&mut self, id: impl Into<NodeId>, executor: F) -> &mut Self
    where
        F: Fn(S) -> BoxFuture<'static, std::result::Result<S, BoxError>> + Send + Sync + 'static,
    {
        let id = id.into();
        let spec = NodeSpec {
            name: id.clone(),
            executor: Arc::new(executor),
        };
        self.graph.add_node(id, spec);
        self
    }

    /// Add a direct (unconditional) edge between two nodes.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        self.graph.add_edge(from.into(), to.into());
        self
    }

    /// Add a conditional edge with state-driven routing.
    ///
    /// `router` returns a branch key; `branches` maps every legal key to
    /// its target node (or [`END`]).
    pub fn add_conditional_edge<F>(
        &mut self,
        from: impl Into<NodeId>,
        router: F,
        branches: HashMap<String, NodeId>,
    ) -> &mut Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
    {
        self.graph
            .add_conditional_edge(from.into(), Arc::new(router), branches);
        self
    }

    /// Set the node where execution begins.
    ///
    /// Equivalent to wiring an edge out of [`START`].
    pub fn set_entry(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.graph.add_edge(START.to_string(), node.into());
        self
    }

    /// Mark a node as terminal by wiring it to [`END`].
    pub fn add_finish(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.graph.add_edge(node.into(), END.to_string());
        self
    }

    /// Validate the structure and produce an executable graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Validation`] if the entry point is missing, an
    /// edge references an unknown node, a conditional edge declares no
    /// branches, or a node has no successor rule.
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        self.graph.validate().map_err(GraphError::Validation)?;
        Ok(CompiledGraph::new(self.graph))
    }

    /// Borrow the underlying graph structure.
    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }
}

impl<S: FlowState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for StateGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateGraph").field("graph", &self.graph).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct TestState {
        visited: Vec<String>,
    }

    impl FlowState for TestState {
        fn record_visit(&mut self, node: &str) {
            self.visited.push(node.to_string());
        }
    }

    #[test]
    fn test_compile_valid_graph() {
        let mut graph: StateGraph<TestState> = StateGraph::new();
        graph.add_node("step", |state| Box::pin(async move { Ok(state) }));
        graph.set_entry("step");
        graph.add_finish("step");
        assert!(graph.compile().is_ok());
    }

    #[test]
    fn test_compile_rejects_dangling_edge() {
        let mut graph: StateGraph<TestState> = StateGraph::new();
        graph.add_node("step", |state| Box::pin(async move { Ok(state) }));
        graph.set_entry("step");
        graph.add_edge("step", "missing");
        let err = graph.compile().unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[test]
    fn test_compile_rejects_node_without_successor() {
        let mut graph: StateGraph<TestState> = StateGraph::new();
        graph.add_node("step", |state| Box::pin(async move { Ok(state) }));
        graph.set_entry("step");
        assert!(graph.compile().is_err());
    }
}
