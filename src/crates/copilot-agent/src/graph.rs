//! Graph assembly for the copilot workflow
//!
//! Eight nodes, three condition functions, one bounded feedback edge:
//!
//! ```text
//! router ──┬─▶ retriever ─▶ planner ──┬─▶ nl_to_sql ─▶ executor ─▶ synthesizer ─▶ validator ──▶ END
//!          │                          └─▶ synthesizer                                 │
//!          └─▶ nl_to_sql                                                              ▼
//!                 ▲──────────────────────────────────────────────────────────────── repair
//! ```
//!
//! The repair edge fires at most [`REPAIR_LIMIT`] times per run; exhausting
//! the ceiling still terminates normally with the last-computed (possibly
//! invalid) state.

use std::collections::HashMap;
use std::sync::Arc;

use flowgraph_core::{CompiledGraph, GraphError, StateGraph, END};

use crate::collab::Collaborators;
use crate::nodes;
use crate::state::WorkflowState;

pub const ROUTER: &str = "router";
pub const RETRIEVER: &str = "retriever";
pub const PLANNER: &str = "planner";
pub const NL_TO_SQL: &str = "nl_to_sql";
pub const EXECUTOR: &str = "executor";
pub const SYNTHESIZER: &str = "synthesizer";
pub const VALIDATOR: &str = "validator";
pub const REPAIR: &str = "repair";

/// Branch key the validator's condition function uses to terminate.
pub const END_BRANCH: &str = "end";

/// Document chunks requested from the ranking collaborator.
pub const TOP_K: usize = 3;

/// Ceiling on repair cycles per run.
pub const REPAIR_LIMIT: u32 = 2;

macro_rules! node {
    ($graph:expr, $name:expr, $func:path, $collab:expr) => {{
        let collab = $collab.clone();
        $graph.add_node($name, move |state: WorkflowState| {
            let collab = collab.clone();
            Box::pin(async move { Ok($func(collab, state).await) })
        });
    }};
}

/// Build and compile the workflow graph over the given collaborator set.
pub fn build_graph(
    collaborators: Arc<Collaborators>,
) -> Result<CompiledGraph<WorkflowState>, GraphError> {
    let mut graph = StateGraph::new();

    node!(graph, ROUTER, nodes::router, collaborators);
    node!(graph, RETRIEVER, nodes::retriever, collaborators);
    node!(graph, PLANNER, nodes::planner, collaborators);
    node!(graph, NL_TO_SQL, nodes::nl_to_sql, collaborators);
    node!(graph, EXECUTOR, nodes::executor, collaborators);
    node!(graph, SYNTHESIZER, nodes::synthesizer, collaborators);
    node!(graph, VALIDATOR, nodes::validator, collaborators);
    node!(graph, REPAIR, nodes::repair, collaborators);

    graph.set_entry(ROUTER);

    graph.add_conditional_edge(
        ROUTER,
        nodes::route_after_router,
        HashMap::from([
            (RETRIEVER.to_string(), RETRIEVER.to_string()),
            (NL_TO_SQL.to_string(), NL_TO_SQL.to_string()),
        ]),
    );

    graph.add_edge(RETRIEVER, PLANNER);

    graph.add_conditional_edge(
        PLANNER,
        nodes::route_after_planner,
        HashMap::from([
            (SYNTHESIZER.to_string(), SYNTHESIZER.to_string()),
            (NL_TO_SQL.to_string(), NL_TO_SQL.to_string()),
        ]),
    );

    graph.add_edge(NL_TO_SQL, EXECUTOR);
    graph.add_edge(EXECUTOR, SYNTHESIZER);
    graph.add_edge(SYNTHESIZER, VALIDATOR);

    graph.add_conditional_edge(
        VALIDATOR,
        nodes::should_repair,
        HashMap::from([
            (REPAIR.to_string(), REPAIR.to_string()),
            (END_BRANCH.to_string(), END.to_string()),
        ]),
    );

    graph.add_edge(REPAIR, NL_TO_SQL);

    graph.compile()
}
