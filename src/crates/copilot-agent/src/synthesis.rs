//! Deterministic answer synthesis
//!
//! The default [`Synthesizer`](crate::collab::Synthesizer): a formatter
//! that derives the typed answer from query rows (or, on the RAG-only
//! path, from extracted constraints), scores confidence heuristically, and
//! collects citations from document ids and queried tables.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use crate::collab::{CollabError, Synthesis, SynthesisRequest, Synthesizer};
use crate::state::{rag_only, Answer, Constraints, DocumentChunk, FormatHint, ProductRevenue, QueryResult};

/// [`Synthesizer`] that formats answers without calling out to anything.
pub struct DeterministicSynthesizer;

#[async_trait]
impl Synthesizer for DeterministicSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Synthesis, CollabError> {
        let mut citations: BTreeSet<String> =
            request.docs.iter().map(|doc| doc.id.clone()).collect();
        if !request.query_result.rows.is_empty() {
            citations.extend(request.query_result.tables_used.iter().cloned());
        }

        let answer = derive_answer(&request);
        let confidence = confidence_score(request.query_result, request.docs, &answer);
        let explanation = explain(&request);

        Ok(Synthesis {
            answer,
            confidence,
            explanation,
            citations,
        })
    }
}

/// Derive the typed answer for the declared format hint.
pub fn derive_answer(request: &SynthesisRequest<'_>) -> Answer {
    // On the RAG-only path a count answer comes from the documents via
    // extracted constraints, not from query rows.
    if rag_only(request.route, request.generated_query) && request.format_hint == FormatHint::Int {
        if let Some(days) = policy_days(request.constraints) {
            return Answer::Int(i64::from(days));
        }
    }

    let rows = &request.query_result.rows;
    match request.format_hint {
        FormatHint::Int => Answer::Int(first_cell(rows).and_then(as_i64).unwrap_or(0)),
        FormatHint::Float => Answer::Float(first_cell(rows).and_then(as_f64).map(round2).unwrap_or(0.0)),
        FormatHint::CategoryQuantity => match rows.first() {
            Some(row) => Answer::CategoryQuantity {
                category: row.first().map(as_text).unwrap_or_default(),
                quantity: row.get(1).and_then(as_i64).unwrap_or(0),
            },
            None => Answer::CategoryQuantity {
                category: String::new(),
                quantity: 0,
            },
        },
        FormatHint::CustomerMargin => match rows.first() {
            Some(row) => Answer::CustomerMargin {
                customer: row.first().map(as_text).unwrap_or_default(),
                margin: row.get(1).and_then(as_f64).map(round2).unwrap_or(0.0),
            },
            None => Answer::CustomerMargin {
                customer: String::new(),
                margin: 0.0,
            },
        },
        FormatHint::ProductRevenueList => Answer::Products(
            rows.iter()
                .filter_map(|row| {
                    Some(ProductRevenue {
                        product: row.first().map(as_text)?,
                        revenue: round2(row.get(1).and_then(as_f64)?),
                    })
                })
                .collect(),
        ),
    }
}

/// Return-policy day count for the constrained category.
///
/// Falls back to the only extracted figure when the question named no
/// category but the documents mentioned exactly one.
fn policy_days(constraints: &Constraints) -> Option<u32> {
    if let Some(category) = &constraints.category {
        if let Some(days) = constraints.return_days.get(category) {
            return Some(*days);
        }
    }
    if constraints.return_days.len() == 1 {
        return constraints.return_days.values().next().copied();
    }
    None
}

/// Heuristic confidence: base 0.5, +0.3 for a successful query with rows,
/// +0.1 for retrieved documents, +0.1 for a non-empty answer; capped at 1.
pub fn confidence_score(result: &QueryResult, docs: &[DocumentChunk], answer: &Answer) -> f64 {
    let mut score: f64 = 0.5;
    if result.error.is_none() && !result.rows.is_empty() {
        score += 0.3;
    }
    if !docs.is_empty() {
        score += 0.1;
    }
    if !answer.is_structurally_empty() {
        score += 0.1;
    }
    score.min(1.0)
}

fn explain(request: &SynthesisRequest<'_>) -> String {
    match (!request.docs.is_empty(), !request.query_result.rows.is_empty()) {
        (true, true) => "Answer derived from documents and database query.",
        (true, false) => "Answer derived from documents.",
        (false, true) => "Answer derived from database query.",
        (false, false) => "No supporting evidence was found.",
    }
    .to_string()
}

fn first_cell(rows: &[Vec<Value>]) -> Option<&Value> {
    rows.first().and_then(|row| row.first())
}

fn as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|v| v.round() as i64))
}

fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Route;
    use proptest::prelude::*;
    use serde_json::json;

    fn request<'a>(
        format_hint: FormatHint,
        route: Option<Route>,
        query_result: &'a QueryResult,
        constraints: &'a Constraints,
        generated_query: &'a str,
    ) -> SynthesisRequest<'a> {
        SynthesisRequest {
            question: "test",
            format_hint,
            route,
            docs: &[],
            query_result,
            constraints,
            generated_query,
        }
    }

    #[test]
    fn test_int_answer_from_first_cell() {
        let result = QueryResult {
            columns: vec!["n".to_string()],
            rows: vec![vec![json!(42)]],
            error: None,
            tables_used: vec![],
        };
        let constraints = Constraints::default();
        let answer = derive_answer(&request(
            FormatHint::Int,
            Some(Route::Sql),
            &result,
            &constraints,
            "SELECT 42",
        ));
        assert_eq!(answer, Answer::Int(42));
    }

    #[test]
    fn test_float_answer_rounds_to_cents() {
        let result = QueryResult {
            columns: vec!["aov".to_string()],
            rows: vec![vec![json!(1264.90843)]],
            error: None,
            tables_used: vec![],
        };
        let constraints = Constraints::default();
        let answer = derive_answer(&request(
            FormatHint::Float,
            Some(Route::Sql),
            &result,
            &constraints,
            "SELECT aov",
        ));
        assert_eq!(answer, Answer::Float(1264.91));
    }

    #[test]
    fn test_rag_only_int_comes_from_constraints() {
        let constraints = Constraints {
            category: Some("Beverages".to_string()),
            return_days: [("Beverages".to_string(), 14)].into(),
            ..Constraints::default()
        };
        let empty = QueryResult::default();
        let answer = derive_answer(&request(
            FormatHint::Int,
            Some(Route::Rag),
            &empty,
            &constraints,
            "",
        ));
        assert_eq!(answer, Answer::Int(14));
    }

    #[test]
    fn test_record_answer_from_row() {
        let result = QueryResult {
            columns: vec!["CategoryName".to_string(), "total_qty".to_string()],
            rows: vec![vec![json!("Beverages"), json!(120)]],
            error: None,
            tables_used: vec![],
        };
        let constraints = Constraints::default();
        let answer = derive_answer(&request(
            FormatHint::CategoryQuantity,
            Some(Route::Sql),
            &result,
            &constraints,
            "SELECT ...",
        ));
        assert_eq!(
            answer,
            Answer::CategoryQuantity {
                category: "Beverages".to_string(),
                quantity: 120,
            }
        );
    }

    #[test]
    fn test_list_answer_from_all_rows() {
        let result = QueryResult {
            columns: vec!["ProductName".to_string(), "revenue".to_string()],
            rows: vec![
                vec![json!("Côte de Blaye"), json!(141396.7356)],
                vec![json!("Thüringer Rostbratwurst"), json!(80368.6724)],
            ],
            error: None,
            tables_used: vec![],
        };
        let constraints = Constraints::default();
        let answer = derive_answer(&request(
            FormatHint::ProductRevenueList,
            Some(Route::Sql),
            &result,
            &constraints,
            "SELECT ...",
        ));
        match answer {
            Answer::Products(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].revenue, 141396.74);
            }
            other => panic!("unexpected answer: {other:?}"),
        }
    }

    #[test]
    fn test_no_rows_yields_empty_record() {
        let empty = QueryResult::default();
        let constraints = Constraints::default();
        let answer = derive_answer(&request(
            FormatHint::CategoryQuantity,
            Some(Route::Sql),
            &empty,
            &constraints,
            "SELECT ...",
        ));
        assert!(answer.is_structurally_empty());
    }

    #[test]
    fn test_confidence_components() {
        let docs = vec![DocumentChunk {
            id: "d::chunk0".to_string(),
            source: "d.md".to_string(),
            content: "text".to_string(),
            score: 0.4,
        }];
        let good = QueryResult {
            columns: vec!["n".to_string()],
            rows: vec![vec![json!(1)]],
            error: None,
            tables_used: vec![],
        };

        assert_eq!(
            confidence_score(&QueryResult::default(), &[], &Answer::Unset),
            0.5
        );
        assert_eq!(confidence_score(&good, &docs, &Answer::Int(7)), 1.0);
        assert_eq!(
            confidence_score(&QueryResult::failed("boom"), &docs, &Answer::Int(7)),
            0.7
        );
    }

    proptest! {
        #[test]
        fn prop_confidence_stays_in_unit_interval(
            has_error in any::<bool>(),
            row_count in 0usize..4,
            doc_count in 0usize..4,
            answer_value in any::<i64>(),
        ) {
            let result = QueryResult {
                columns: vec![],
                rows: vec![vec![json!(1)]; row_count],
                error: has_error.then(|| "boom".to_string()),
                tables_used: vec![],
            };
            let docs: Vec<DocumentChunk> = (0..doc_count)
                .map(|i| DocumentChunk {
                    id: format!("d::chunk{i}"),
                    source: "d.md".to_string(),
                    content: "text".to_string(),
                    score: 0.1,
                })
                .collect();

            let score = confidence_score(&result, &docs, &Answer::Int(answer_value));
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
