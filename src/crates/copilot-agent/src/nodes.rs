//! Workflow nodes and condition functions
//!
//! Each node receives the full [`WorkflowState`], talks to at most one
//! collaborator, and returns the updated state. Collaborator failures are
//! caught here and degraded to deterministic fallbacks: a failure becomes
//! an entry in `state.errors` or `query_result.error`, never an error the
//! engine can observe.
//!
//! Condition functions are pure readers of the state; the branch keys they
//! return are declared in the graph wiring
//! ([`build_graph`](crate::graph::build_graph)).

use std::sync::Arc;

use crate::collab::{Collaborators, SynthesisRequest};
use crate::extract;
use crate::graph::{END_BRANCH, NL_TO_SQL, REPAIR, REPAIR_LIMIT, RETRIEVER, SYNTHESIZER, TOP_K};
use crate::heuristics::keyword_route;
use crate::state::{QueryResult, Route, WorkflowState};
use crate::validate::{self, ValidationInput};

/// Classify the question and set the route, exactly once.
///
/// Falls back to keyword routing when the classifier fails.
pub async fn router(collab: Arc<Collaborators>, mut state: WorkflowState) -> WorkflowState {
    let route = match collab.classifier.classify(&state.question).await {
        Ok(route) => route,
        Err(error) => {
            tracing::warn!(%error, "classifier failed, using keyword fallback");
            keyword_route(&state.question)
        }
    };
    tracing::debug!(?route, "question routed");
    state.route = Some(route);
    state
}

/// Retrieve the top-K relevant document chunks.
pub async fn retriever(collab: Arc<Collaborators>, mut state: WorkflowState) -> WorkflowState {
    match collab.ranker.retrieve(&state.question, TOP_K).await {
        Ok(docs) => {
            tracing::debug!(found = docs.len(), "documents retrieved");
            state.retrieved_docs = docs;
        }
        Err(error) => {
            tracing::warn!(%error, "retrieval failed");
            state.errors.push(format!("retrieval failed: {error}"));
        }
    }
    state
}

/// Extract constraints from the retrieved documents and the question.
pub async fn planner(_collab: Arc<Collaborators>, mut state: WorkflowState) -> WorkflowState {
    let found = extract::extract(&state.question, &state.retrieved_docs);
    state.constraints.merge(found);
    tracing::debug!(constraints = ?state.constraints.field_names(), "constraints extracted");
    state
}

/// Generate the data query; an empty query means none is required.
pub async fn nl_to_sql(collab: Arc<Collaborators>, mut state: WorkflowState) -> WorkflowState {
    let schema = match collab.executor.schema().await {
        Ok(schema) => schema,
        Err(error) => {
            tracing::warn!(%error, "schema unavailable");
            state.errors.push(format!("schema unavailable: {error}"));
            String::new()
        }
    };

    state.generated_query = match collab
        .generator
        .generate(&state.question, &schema, &state.constraints)
        .await
    {
        Ok(sql) => {
            if sql.is_empty() {
                tracing::debug!("no query required");
            } else {
                tracing::debug!(length = sql.len(), "query generated");
            }
            sql
        }
        Err(error) => {
            tracing::warn!(%error, "query generation failed");
            state.errors.push(format!("query generation failed: {error}"));
            String::new()
        }
    };
    state
}

/// Execute the generated query; skipped when none was generated.
pub async fn executor(collab: Arc<Collaborators>, mut state: WorkflowState) -> WorkflowState {
    if state.generated_query.is_empty() {
        tracing::debug!("no query to execute");
        state.query_result = QueryResult::default();
        return state;
    }

    let result = collab.executor.execute(&state.generated_query).await;
    match &result.error {
        Some(error) => {
            tracing::warn!(%error, "query execution failed");
            state.errors.push(format!("query error: {error}"));
        }
        None => tracing::debug!(rows = result.rows.len(), "query executed"),
    }
    state.query_result = result;
    state
}

/// Synthesize the final answer, confidence, explanation, and citations.
///
/// On failure the last known answer (possibly unset) is kept.
pub async fn synthesizer(collab: Arc<Collaborators>, mut state: WorkflowState) -> WorkflowState {
    let outcome = collab
        .synthesizer
        .synthesize(SynthesisRequest {
            question: &state.question,
            format_hint: state.format_hint,
            route: state.route,
            docs: &state.retrieved_docs,
            query_result: &state.query_result,
            constraints: &state.constraints,
            generated_query: &state.generated_query,
        })
        .await;

    match outcome {
        Ok(synthesis) => {
            tracing::debug!(confidence = synthesis.confidence, "answer synthesized");
            state.final_answer = synthesis.answer;
            state.confidence = synthesis.confidence;
            state.explanation = synthesis.explanation;
            state.citations = synthesis.citations;
        }
        Err(error) => {
            tracing::warn!(%error, "synthesis failed");
            state.errors.push(format!("synthesis failed: {error}"));
        }
    }
    state
}

/// Validate the answer: clear the accumulated errors, then store the
/// verdict's failure reasons.
pub async fn validator(_collab: Arc<Collaborators>, mut state: WorkflowState) -> WorkflowState {
    state.errors.clear();
    let failures = validate::check(&ValidationInput::from_state(&state));

    if state.citations.is_empty() {
        tracing::warn!("no citations support the answer");
    }
    if failures.is_empty() {
        tracing::debug!("answer is valid");
    } else {
        tracing::warn!(?failures, "validation failed");
    }

    state.errors = failures;
    state
}

/// Take one repair cycle: bump the counter, drop a failed query so it gets
/// regenerated, and clear the error list for the next attempt.
pub async fn repair(_collab: Arc<Collaborators>, mut state: WorkflowState) -> WorkflowState {
    state.repair_count += 1;
    tracing::info!(attempt = state.repair_count, "repair cycle");

    if state.query_result.error.is_some() {
        state.generated_query.clear();
    }
    state.errors.clear();
    state
}

/// After the router: document-backed routes go through retrieval, pure
/// data routes straight to query generation.
pub fn route_after_router(state: &WorkflowState) -> String {
    match state.route {
        Some(Route::Rag) | Some(Route::Hybrid) => RETRIEVER,
        Some(Route::Sql) | None => NL_TO_SQL,
    }
    .to_string()
}

/// After the planner: an outright document route needs no query, so it
/// skips to synthesis. (No query exists yet at this point; the combined
/// RAG-only decision applies downstream of generation.)
pub fn route_after_planner(state: &WorkflowState) -> String {
    match state.route {
        Some(Route::Rag) => SYNTHESIZER,
        _ => NL_TO_SQL,
    }
    .to_string()
}

/// After the validator: repair while errors remain and the ceiling has not
/// been reached; otherwise terminate with whatever was last computed.
pub fn should_repair(state: &WorkflowState) -> String {
    if !state.errors.is_empty() && state.repair_count < REPAIR_LIMIT {
        REPAIR.to_string()
    } else {
        END_BRANCH.to_string()
    }
}
