//! Core graph data structures and types
//!
//! This module defines the building blocks for constructing executable
//! workflows: nodes, edges, and the [`Graph`] container that
//! [`StateGraph`](crate::StateGraph) builds and
//! [`CompiledGraph`](crate::CompiledGraph) executes.
//!
//! A graph consists of:
//!
//! - **Nodes**: named async state transformations (`S -> S`)
//! - **Edges**: one successor rule per node, either a fixed target or a
//!   condition function over the current state
//! - **Entry point**: where execution begins (defaults to [`START`])
//!
//! ```text
//! START ──▶ router ──┬──▶ fetch ──▶ merge ──▶ END
//!                    └──▶ merge
//! ```
//!
//! # Examples
//!
//! ```rust
//! use flowgraph_core::graph::{Graph, NodeSpec, START, END};
//! use std::sync::Arc;
//!
//! # #[derive(Clone)] struct MyState;
//! let mut graph: Graph<MyState> = Graph::new();
//!
//! graph.add_node(
//!     "process".to_string(),
//!     NodeSpec {
//!         name: "process".to_string(),
//!         executor: Arc::new(|state| Box::pin(async move { Ok(state) })),
//!     },
//! );
//!
//! graph.add_edge(START.to_string(), "process".to_string());
//! graph.add_edge("process".to_string(), END.to_string());
//!
//! assert!(graph.validate().is_ok());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::BoxError;

/// Node identifier - unique name for each node in the graph.
pub type NodeId = String;

/// Special node identifier for the graph entry point.
///
/// `START` is a virtual node marking where execution begins. It never
/// executes any logic; the engine resolves its successor rule and moves on.
pub const START: &str = "__start__";

/// Special node identifier for graph termination.
///
/// Routing to `END` (directly, or through a conditional branch) halts the
/// run and hands the final state back to the caller.
pub const END: &str = "__end__";

/// Node executor function type.
///
/// An executor is an async function that consumes the current state and
/// returns the updated state. Executors are expected to absorb failures of
/// anything they call and surface them as data inside the state; an `Err`
/// here aborts the whole run.
pub type NodeExecutor<S> =
    Arc<dyn Fn(S) -> BoxFuture<'static, std::result::Result<S, BoxError>> + Send + Sync>;

/// Condition function type for conditional edges.
///
/// A router examines the current state and returns a *branch key*. The key
/// is looked up in the edge's declared branch map to find the successor
/// node; a key with no declared branch is a
/// [`Configuration`](crate::error::GraphError::Configuration) error.
pub type RouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Node specification: a named executor.
pub struct NodeSpec<S> {
    /// Human-readable name, used for logging and trace entries.
    pub name: String,
    /// Async executor that transforms the state.
    pub executor: NodeExecutor<S>,
}

impl<S> Clone for NodeSpec<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<S> std::fmt::Debug for NodeSpec<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("executor", &"<function>")
            .finish()
    }
}

/// Successor rule for a node.
///
/// Every node has exactly one rule: an unconditional transition, or a
/// condition function with a closed map of legal branch targets.
pub enum Edge<S> {
    /// Unconditional edge to a specific node (or [`END`]).
    Direct(NodeId),

    /// Conditional edge with state-driven routing.
    Conditional {
        /// Condition function returning a branch key.
        router: RouterFn<S>,

        /// Map of branch keys to target nodes.
        ///
        /// Declares every successor the router may legally select; used for
        /// validation and for the runtime undeclared-branch check.
        branches: HashMap<String, NodeId>,
    },
}

impl<S> Clone for Edge<S> {
    fn clone(&self) -> Self {
        match self {
            Edge::Direct(to) => Edge::Direct(to.clone()),
            Edge::Conditional { router, branches } => Edge::Conditional {
                router: router.clone(),
                branches: branches.clone(),
            },
        }
    }
}

impl<S> std::fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(node_id) => f.debug_tuple("Direct").field(node_id).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Static graph structure: nodes plus one successor rule per node.
///
/// Typically built through [`StateGraph`](crate::StateGraph) rather than
/// directly. The topology is fixed at definition time; nothing is added or
/// removed during a run.
pub struct Graph<S> {
    /// All nodes, keyed by their unique ids.
    pub nodes: HashMap<NodeId, NodeSpec<S>>,

    /// Successor rule per source node. [`START`] may also carry a rule.
    pub edges: HashMap<NodeId, Edge<S>>,

    /// Entry point node id where execution begins. Defaults to [`START`].
    pub entry: NodeId,
}

impl<S> Graph<S> {
    /// Create a new empty graph with the entry point set to [`START`].
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: START.to_string(),
        }
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, id: NodeId, spec: NodeSpec<S>) {
        self.nodes.insert(id, spec);
    }

    /// Add a direct (unconditional) edge between two nodes.
    ///
    /// Replaces any successor rule already declared for `from`: a node has
    /// exactly one rule.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.insert(from, Edge::Direct(to));
    }

    /// Add a conditional edge with state-driven routing.
    ///
    /// `branches` declares every node the router may legally select; keys
    /// are whatever vocabulary the router speaks, values are node ids (or
    /// [`END`]).
    pub fn add_conditional_edge(
        &mut self,
        from: NodeId,
        router: RouterFn<S>,
        branches: HashMap<String, NodeId>,
    ) {
        self.edges.insert(from, Edge::Conditional { router, branches });
    }

    /// Set the entry point for graph execution.
    pub fn set_entry(&mut self, node: NodeId) {
        self.entry = node;
    }

    /// Look up the successor rule declared for `from`.
    pub fn successor(&self, from: &str) -> Option<&Edge<S>> {
        self.edges.get(from)
    }

    /// Validate the graph structure.
    ///
    /// Checks that the entry point exists, that every edge source and
    /// target exists (allowing [`START`] sources and [`END`] targets), that
    /// every conditional branch target exists, and that every node carries
    /// a successor rule so a run can always make progress.
    ///
    /// # Errors
    ///
    /// Returns a descriptive message naming the first offending node or
    /// edge.
    pub fn validate(&self) -> Result<(), String> {
        if !self.nodes.contains_key(&self.entry) && self.entry != START {
            return Err(format!("entry point '{}' does not exist", self.entry));
        }
        if self.entry == START && !self.edges.contains_key(START) {
            return Err("no edge out of the start point".to_string());
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) && from != START {
                return Err(format!("edge source '{from}' does not exist"));
            }

            match edge {
                Edge::Direct(to) => {
                    if !self.nodes.contains_key(to) && to != END {
                        return Err(format!("edge target '{to}' does not exist"));
                    }
                }
                Edge::Conditional { branches, .. } => {
                    if branches.is_empty() {
                        return Err(format!("conditional edge from '{from}' declares no branches"));
                    }
                    for to in branches.values() {
                        if !self.nodes.contains_key(to) && to != END {
                            return Err(format!("branch target '{to}' does not exist"));
                        }
                    }
                }
            }
        }

        for id in self.nodes.keys() {
            if !self.edges.contains_key(id) {
                return Err(format!("node '{id}' has no successor rule"));
            }
        }

        Ok(())
    }
}

impl<S> Default for Graph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Graph<S> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            entry: self.entry.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Graph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("entry", &self.entry)
            .finish()
    }
}
