//! Answer validation
//!
//! A pure function over the fields the verdict depends on: same inputs,
//! same verdict, no matter when or how often it runs. The validator node
//! wraps this, clearing the accumulated error list first and storing the
//! returned failure reasons.

use std::collections::BTreeSet;

use crate::state::{rag_only, Answer, FormatHint, QueryResult, Route, WorkflowState};

/// The fields validation is allowed to look at.
#[derive(Debug)]
pub struct ValidationInput<'a> {
    pub route: Option<Route>,
    pub generated_query: &'a str,
    pub query_result: &'a QueryResult,
    pub format_hint: FormatHint,
    pub final_answer: &'a Answer,
    pub citations: &'a BTreeSet<String>,
}

impl<'a> ValidationInput<'a> {
    pub fn from_state(state: &'a WorkflowState) -> Self {
        Self {
            route: state.route,
            generated_query: &state.generated_query,
            query_result: &state.query_result,
            format_hint: state.format_hint,
            final_answer: &state.final_answer,
            citations: &state.citations,
        }
    }
}

/// Check the synthesized answer; returns failure reasons, empty when valid.
///
/// Rules:
/// - a failed query invalidates the run unless the path was RAG-only;
/// - the answer must structurally match the declared format hint;
/// - an empty/default answer on a non-RAG-only path is invalid;
/// - missing citations never invalidate (the caller may warn).
pub fn check(input: &ValidationInput<'_>) -> Vec<String> {
    let mut failures = Vec::new();
    let rag_only = rag_only(input.route, input.generated_query);

    if input.query_result.error.is_some() && !rag_only {
        failures.push("query execution failed".to_string());
    }

    if !input.final_answer.matches(input.format_hint) {
        failures.push(format!(
            "answer does not match declared shape {:?}",
            input.format_hint
        ));
    } else if input.final_answer.is_structurally_empty() && !rag_only {
        failures.push("query produced an empty result".to_string());
    }

    failures
}
