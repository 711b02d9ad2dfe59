//! Sequential graph execution
//!
//! [`CompiledGraph`] is the runner: given an initial state it executes the
//! entry node, consults that node's successor rule (fixed edge or condition
//! function), and repeats until the rule yields [`END`](crate::graph::END).
//! Execution is strictly sequential (one node at a time, one state in
//! flight) and the runner holds nothing beyond the current node id and the
//! threaded state.
//!
//! The runner performs no retries of its own. Feedback loops belong in the
//! graph topology (an edge from a validation node back to an earlier
//! stage); a node that calls something fallible is expected to absorb the
//! failure and surface it as data in the state.
//!
//! Exactly one [`FlowState::record_visit`] call is made per node execution,
//! immediately after the node's executor returns, so a state type that
//! keeps a trace sees every transition exactly once.

use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeId, END, START};

/// State threading contract for graph execution.
///
/// The runner owns one value of the implementing type for the duration of a
/// run and passes it from node to node; implementors use
/// [`record_visit`](Self::record_visit) to keep an audit trail of the
/// transitions.
pub trait FlowState: Send + 'static {
    /// Record that `node` has just executed.
    ///
    /// Called by the runner exactly once per node execution, after the
    /// node's executor returns the updated state.
    fn record_visit(&mut self, node: &str);
}

/// Default bound on node executions per run.
///
/// A correctly wired graph with bounded feedback edges terminates well
/// below this; hitting the limit means a cycle without an exit condition.
pub const DEFAULT_STEP_LIMIT: usize = 25;

/// An executable workflow graph.
///
/// Produced by [`StateGraph::compile`](crate::StateGraph::compile). Cheap
/// to share: invoking takes `&self`, so one compiled graph serves any
/// number of runs, each with its own exclusively-owned state.
pub struct CompiledGraph<S> {
    graph: Graph<S>,
    step_limit: usize,
}

impl<S: FlowState> CompiledGraph<S> {
    pub(crate) fn new(graph: Graph<S>) -> Self {
        Self {
            graph,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Override the per-run step limit.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Execute the graph to completion and return the final state.
    ///
    /// # Errors
    ///
    /// - [`GraphError::Configuration`] if a condition function returns a
    ///   branch key that was never declared for its node. This indicates a
    ///   programming defect and aborts the run immediately.
    /// - [`GraphError::NodeExecution`] if a node executor returns an error.
    /// - [`GraphError::Execution`] if the step limit is exceeded.
    #[tracing::instrument(skip(self, input), fields(nodes = self.graph.nodes.len()))]
    pub async fn invoke(&self, input: S) -> Result<S> {
        let mut state = input;
        let mut current: NodeId = if self.graph.entry == START {
            self.next_node(START, &state)?
        } else {
            self.graph.entry.clone()
        };
        let mut steps = 0usize;

        while current != END {
            if steps >= self.step_limit {
                return Err(GraphError::Execution(format!(
                    "step limit of {} exceeded at node '{}'",
                    self.step_limit, current
                )));
            }

            let spec = self.graph.nodes.get(&current).ok_or_else(|| {
                GraphError::Validation(format!("node '{current}' is not defined"))
            })?;

            tracing::debug!(node = %current, step = steps, "executing node");
            state = (spec.executor)(state)
                .await
                .map_err(|e| GraphError::NodeExecution {
                    node: current.clone(),
                    error: e.to_string(),
                })?;
            state.record_visit(&current);
            steps += 1;

            current = self.next_node(&current, &state)?;
        }

        tracing::debug!(steps, "run complete");
        Ok(state)
    }

    /// Resolve the successor of `from` against the current state.
    fn next_node(&self, from: &str, state: &S) -> Result<NodeId> {
        match self.graph.successor(from) {
            None => Err(GraphError::Execution(format!(
                "node '{from}' has no successor rule"
            ))),
            Some(Edge::Direct(to)) => Ok(to.clone()),
            Some(Edge::Conditional { router, branches }) => {
                let key = router(state);
                match branches.get(&key) {
                    Some(to) => {
                        tracing::debug!(node = %from, branch = %key, target = %to, "conditional route");
                        Ok(to.clone())
                    }
                    None => Err(GraphError::Configuration {
                        node: from.to_string(),
                        branch: key,
                    }),
                }
            }
        }
    }

    /// Borrow the underlying graph structure.
    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }
}

impl<S> std::fmt::Debug for CompiledGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("entry", &self.graph.entry)
            .field("node_count", &self.graph.nodes.len())
            .field("step_limit", &self.step_limit)
            .finish()
    }
}
