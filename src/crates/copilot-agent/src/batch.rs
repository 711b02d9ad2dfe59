//! Batch processing surface
//!
//! Question records in, answer records out, order preserved. Each question
//! gets its own engine invocation and its own [`WorkflowState`]; nothing is
//! shared between questions, so a caller that wants parallelism can simply
//! run several invocations against the same compiled graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use flowgraph_core::{CompiledGraph, GraphError};

use crate::state::{FormatHint, WorkflowState};

/// One input question, as carried in the batch JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub question: String,
    pub format_hint: FormatHint,
}

/// One output record, as written to the batch JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: String,
    pub final_answer: Value,
    /// Generated query text; empty when no query was required.
    pub sql: String,
    pub confidence: f64,
    pub explanation: String,
    pub citations: Vec<String>,
}

impl AnswerRecord {
    /// Project the final workflow state onto the output shape.
    pub fn from_state(state: &WorkflowState) -> Self {
        Self {
            id: state.question_id.clone(),
            final_answer: state.final_answer.to_value(),
            sql: state.generated_query.clone(),
            confidence: state.confidence,
            explanation: state.explanation.clone(),
            citations: state.citations.iter().cloned().collect(),
        }
    }
}

/// Run every question through the graph, sequentially, in input order.
///
/// # Errors
///
/// Only structural graph errors abort the batch; a question whose run
/// exhausted its repairs still produces an answer record (inspect
/// `confidence` and the state's error list for quality).
pub async fn run_batch(
    graph: &CompiledGraph<WorkflowState>,
    questions: &[QuestionRecord],
) -> Result<Vec<AnswerRecord>, GraphError> {
    let mut results = Vec::with_capacity(questions.len());
    for record in questions {
        tracing::info!(id = %record.id, "processing question");
        let initial = WorkflowState::new(&record.id, &record.question, record.format_hint);
        let final_state = graph.invoke(initial).await?;
        tracing::info!(
            id = %record.id,
            confidence = final_state.confidence,
            repairs = final_state.repair_count,
            "question complete"
        );
        results.push(AnswerRecord::from_state(&final_state));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Answer;
    use serde_json::json;

    #[test]
    fn test_question_record_parses_batch_line() {
        let line = r#"{"id": "q1", "question": "How many days?", "format_hint": "int"}"#;
        let record: QuestionRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.id, "q1");
        assert_eq!(record.format_hint, FormatHint::Int);
    }

    #[test]
    fn test_answer_record_projection() {
        let mut state = WorkflowState::new("q1", "How many days?", FormatHint::Int);
        state.final_answer = Answer::Int(14);
        state.confidence = 0.7;
        state.explanation = "Answer derived from documents.".to_string();
        state.citations.insert("product_policy::chunk2".to_string());

        let record = AnswerRecord::from_state(&state);
        assert_eq!(record.id, "q1");
        assert_eq!(record.final_answer, json!(14));
        assert!(record.sql.is_empty());
        assert_eq!(record.citations, vec!["product_policy::chunk2"]);

        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"final_answer\":14"));
    }
}
