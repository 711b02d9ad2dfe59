//! # flowgraph-core - Sequential Stateful Workflow Graphs
//!
//! A small orchestration engine for directed workflows with conditional
//! branching: a typed state record threaded through named async nodes, one
//! node at a time, until a terminal marker is reached.
//!
//! ## Core Concepts
//!
//! - **State**: a single record, exclusively owned by the run, implementing
//!   [`FlowState`]. It is the sole channel of communication between nodes.
//! - **Node**: a named async transformation `S -> S`, added via
//!   [`StateGraph::add_node`]. Nodes absorb the failures of anything they
//!   call and surface them as data in the state.
//! - **Condition function**: decision logic on a conditional edge. Returns
//!   a branch key; the edge's declared branch map turns the key into the
//!   next node. Undeclared keys abort the run with
//!   [`GraphError::Configuration`], a wiring defect rather than a data error.
//! - **Terminal**: routing to [`END`] finishes the run and returns the
//!   final state.
//!
//! The topology is static: every node and every legal branch is declared
//! before [`StateGraph::compile`] validates the structure. Retries and
//! repair loops are expressed as edges in the graph, never inside the
//! runner.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgraph_core::{StateGraph, FlowState, END};
//! use std::collections::HashMap;
//!
//! #[derive(Clone, Default)]
//! struct Ticket {
//!     severity: u8,
//!     escalated: bool,
//!     visited: Vec<String>,
//! }
//!
//! impl FlowState for Ticket {
//!     fn record_visit(&mut self, node: &str) {
//!         self.visited.push(node.to_string());
//!     }
//! }
//!
//! # async fn example() -> Result<(), flowgraph_core::GraphError> {
//! let mut graph = StateGraph::new();
//!
//! graph.add_node("triage", |state: Ticket| Box::pin(async move { Ok(state) }));
//! graph.add_node("escalate", |mut state: Ticket| {
//!     Box::pin(async move {
//!         state.escalated = true;
//!         Ok(state)
//!     })
//! });
//!
//! graph.set_entry("triage");
//! graph.add_conditional_edge(
//!     "triage",
//!     |state: &Ticket| if state.severity > 3 { "escalate" } else { "done" }.to_string(),
//!     HashMap::from([
//!         ("escalate".to_string(), "escalate".to_string()),
//!         ("done".to_string(), END.to_string()),
//!     ]),
//! );
//! graph.add_finish("escalate");
//!
//! let compiled = graph.compile()?;
//! let result = compiled.invoke(Ticket { severity: 5, ..Default::default() }).await?;
//! assert!(result.escalated);
//! assert_eq!(result.visited, vec!["triage", "escalate"]);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod engine;
pub mod error;
pub mod graph;

pub use builder::StateGraph;
pub use engine::{CompiledGraph, FlowState, DEFAULT_STEP_LIMIT};
pub use error::{BoxError, GraphError, Result};
pub use graph::{Edge, Graph, NodeExecutor, NodeId, NodeSpec, RouterFn, END, START};
