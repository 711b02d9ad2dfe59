//! Workflow state threaded through the copilot graph
//!
//! One [`WorkflowState`] is created per question, flows through the engine,
//! and is discarded (or kept as an audit record) once the run terminates.
//! Nothing is shared across questions.
//!
//! The closed enumerations here ([`Route`], [`FormatHint`], [`Answer`])
//! replace the free-text tags the batch input uses on the wire, so every
//! downstream decision is an exhaustive match rather than a substring
//! probe.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use flowgraph_core::FlowState;

use crate::graph;

/// Question route chosen by the router node: documents, data, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Answer comes from retrieved documents alone.
    Rag,
    /// Answer comes from a database query alone.
    Sql,
    /// Documents inform the query (date windows, formulas) and both feed
    /// the answer.
    Hybrid,
}

/// Declared shape of the final answer.
///
/// A closed set, fixed at graph-definition time. The serde renames are the
/// exact tags the batch input carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatHint {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "{category:str, quantity:int}")]
    CategoryQuantity,
    #[serde(rename = "list[{product:str, revenue:float}]")]
    ProductRevenueList,
    #[serde(rename = "{customer:str, margin:float}")]
    CustomerMargin,
}

/// One product/revenue pair in a [`FormatHint::ProductRevenueList`] answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRevenue {
    pub product: String,
    pub revenue: f64,
}

/// Typed final answer, one variant per [`FormatHint`] shape plus [`Unset`].
///
/// Serializes untagged to the plain JSON the batch output expects: a bare
/// number, an object, an array of objects, or `null` while unset.
///
/// [`Unset`]: Answer::Unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Int(i64),
    Float(f64),
    CategoryQuantity { category: String, quantity: i64 },
    CustomerMargin { customer: String, margin: f64 },
    Products(Vec<ProductRevenue>),
    Unset,
}

impl Answer {
    /// Structural shape check against a declared hint.
    ///
    /// An integer satisfies a `Float` hint (a whole-number average is still
    /// a real number); everything else must match its own variant.
    pub fn matches(&self, hint: FormatHint) -> bool {
        match (hint, self) {
            (FormatHint::Int, Answer::Int(_)) => true,
            (FormatHint::Float, Answer::Float(_) | Answer::Int(_)) => true,
            (FormatHint::CategoryQuantity, Answer::CategoryQuantity { .. }) => true,
            (FormatHint::ProductRevenueList, Answer::Products(_)) => true,
            (FormatHint::CustomerMargin, Answer::CustomerMargin { .. }) => true,
            _ => false,
        }
    }

    /// Whether this is a default/empty value rather than a real result.
    ///
    /// Zero numbers, empty record keys, and empty lists are what the
    /// deterministic synthesis strategy produces when it had nothing to
    /// work with.
    pub fn is_structurally_empty(&self) -> bool {
        match self {
            Answer::Unset => true,
            Answer::Int(v) => *v == 0,
            Answer::Float(v) => *v == 0.0,
            Answer::CategoryQuantity { category, quantity } => {
                category.is_empty() && *quantity == 0
            }
            Answer::CustomerMargin { customer, .. } => customer.is_empty(),
            Answer::Products(items) => items.is_empty(),
        }
    }

    /// Plain JSON rendering for the batch output.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One document chunk returned by the ranking collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Stable chunk identifier, e.g. `product_policy::chunk2`.
    pub id: String,
    /// Source file the chunk came from.
    pub source: String,
    /// Chunk text.
    pub content: String,
    /// Relevance score assigned by the ranker; always nonzero.
    pub score: f64,
}

/// Result of executing a generated query.
///
/// `error` is `None` iff execution succeeded; success or failure is never
/// inferred from row counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub error: Option<String>,
    /// Tables the query touched, cited alongside document ids.
    pub tables_used: Vec<String>,
}

impl QueryResult {
    /// Failed result carrying the execution error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Parameters extracted from retrieved documents and the question text.
///
/// Merging is monotonic: within a run a field may be set or refined, never
/// removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Campaign name that implied the date window, if any.
    pub campaign: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    /// KPI named in the documents (e.g. "AOV", "Gross Margin").
    pub kpi: Option<String>,
    /// KPI formula lifted from the documents.
    pub formula: Option<String>,
    /// Cost model used when margin is asked for.
    pub cost_approximation: Option<String>,
    /// Product category the question filters on.
    pub category: Option<String>,
    /// Return-policy durations in days, keyed by product category.
    pub return_days: BTreeMap<String, u32>,
}

impl Constraints {
    /// Merge newly discovered parameters into this set.
    ///
    /// Fields present in `found` overwrite their counterparts; absent
    /// fields leave existing values untouched, so the set only grows.
    pub fn merge(&mut self, found: Constraints) {
        if found.campaign.is_some() {
            self.campaign = found.campaign;
        }
        if found.date_start.is_some() {
            self.date_start = found.date_start;
        }
        if found.date_end.is_some() {
            self.date_end = found.date_end;
        }
        if found.kpi.is_some() {
            self.kpi = found.kpi;
        }
        if found.formula.is_some() {
            self.formula = found.formula;
        }
        if found.cost_approximation.is_some() {
            self.cost_approximation = found.cost_approximation;
        }
        if found.category.is_some() {
            self.category = found.category;
        }
        self.return_days.extend(found.return_days);
    }

    /// Names of the fields currently set, for logging and the trace.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.campaign.is_some() {
            names.push("campaign");
        }
        if self.date_start.is_some() {
            names.push("date_start");
        }
        if self.date_end.is_some() {
            names.push("date_end");
        }
        if self.kpi.is_some() {
            names.push("kpi");
        }
        if self.formula.is_some() {
            names.push("formula");
        }
        if self.cost_approximation.is_some() {
            names.push("cost_approximation");
        }
        if self.category.is_some() {
            names.push("category");
        }
        if !self.return_days.is_empty() {
            names.push("return_days");
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}

/// One engine-recorded entry per node execution. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Node that executed.
    pub node: String,
    /// Snapshot of the fields that node is responsible for.
    pub observed: Value,
}

/// Central RAG-only decision.
///
/// A run is RAG-only when the router chose the document path outright, or
/// when no query was generated (the answer is fully determined by retrieved
/// documents). Every consumer of the notion (validator, synthesis
/// strategy) goes through this function rather than re-deriving it from
/// question text.
pub fn rag_only(route: Option<Route>, generated_query: &str) -> bool {
    matches!(route, Some(Route::Rag)) || generated_query.is_empty()
}

/// Mutable record threaded through every node of one run.
///
/// Exclusively owned by the engine for the duration of the run; the only
/// channel of communication between nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Input question text. Never mutated.
    pub question: String,
    /// Opaque identifier echoed into the output record.
    pub question_id: String,
    /// Declared shape of the final answer.
    pub format_hint: FormatHint,
    /// Set exactly once by the router node.
    pub route: Option<Route>,
    pub retrieved_docs: Vec<DocumentChunk>,
    pub constraints: Constraints,
    /// Generated query text; empty means no query is required.
    pub generated_query: String,
    pub query_result: QueryResult,
    pub final_answer: Answer,
    /// Heuristic confidence in `[0, 1]`.
    pub confidence: f64,
    /// One-line account of the evidence behind the answer.
    pub explanation: String,
    /// Document ids and table names supporting the answer.
    pub citations: BTreeSet<String>,
    /// Failure descriptions accumulated since the last repair.
    pub errors: Vec<String>,
    /// Number of repair cycles taken, bounded by
    /// [`REPAIR_LIMIT`](crate::graph::REPAIR_LIMIT).
    pub repair_count: u32,
    /// Audit trail of node executions; diagnostics only.
    pub trace: Vec<TraceEntry>,
}

impl WorkflowState {
    /// Fresh state for one question.
    pub fn new(
        question_id: impl Into<String>,
        question: impl Into<String>,
        format_hint: FormatHint,
    ) -> Self {
        Self {
            question: question.into(),
            question_id: question_id.into(),
            format_hint,
            route: None,
            retrieved_docs: Vec::new(),
            constraints: Constraints::default(),
            generated_query: String::new(),
            query_result: QueryResult::default(),
            final_answer: Answer::Unset,
            confidence: 0.0,
            explanation: String::new(),
            citations: BTreeSet::new(),
            errors: Vec::new(),
            repair_count: 0,
            trace: Vec::new(),
        }
    }

    /// See [`rag_only`].
    pub fn is_rag_only(&self) -> bool {
        rag_only(self.route, &self.generated_query)
    }
}

impl FlowState for WorkflowState {
    fn record_visit(&mut self, node: &str) {
        let observed = match node {
            graph::ROUTER => json!({ "route": self.route }),
            graph::RETRIEVER => json!({ "docs_found": self.retrieved_docs.len() }),
            graph::PLANNER => json!({ "constraints": self.constraints.field_names() }),
            graph::NL_TO_SQL => json!({ "query_length": self.generated_query.len() }),
            graph::EXECUTOR => match &self.query_result.error {
                Some(error) => json!({ "error": error }),
                None => json!({ "rows": self.query_result.rows.len() }),
            },
            graph::SYNTHESIZER => json!({
                "answer": self.final_answer.to_value(),
                "confidence": self.confidence,
            }),
            graph::VALIDATOR => json!({ "is_valid": self.errors.is_empty() }),
            graph::REPAIR => json!({ "attempt": self.repair_count }),
            _ => json!({}),
        };
        self.trace.push(TraceEntry {
            node: node.to_string(),
            observed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hint_tags_round_trip() {
        let tags = [
            ("\"int\"", FormatHint::Int),
            ("\"float\"", FormatHint::Float),
            ("\"{category:str, quantity:int}\"", FormatHint::CategoryQuantity),
            (
                "\"list[{product:str, revenue:float}]\"",
                FormatHint::ProductRevenueList,
            ),
            ("\"{customer:str, margin:float}\"", FormatHint::CustomerMargin),
        ];
        for (tag, hint) in tags {
            let parsed: FormatHint = serde_json::from_str(tag).unwrap();
            assert_eq!(parsed, hint);
            assert_eq!(serde_json::to_string(&hint).unwrap(), tag);
        }
    }

    #[test]
    fn test_answer_shapes() {
        assert!(Answer::Int(14).matches(FormatHint::Int));
        assert!(Answer::Int(14).matches(FormatHint::Float));
        assert!(!Answer::Float(1.5).matches(FormatHint::Int));
        assert!(Answer::CategoryQuantity {
            category: "Beverages".to_string(),
            quantity: 120,
        }
        .matches(FormatHint::CategoryQuantity));
        assert!(!Answer::Unset.matches(FormatHint::Int));
    }

    #[test]
    fn test_answer_serializes_to_plain_json() {
        assert_eq!(Answer::Int(14).to_value(), json!(14));
        assert_eq!(
            Answer::CategoryQuantity {
                category: "Beverages".to_string(),
                quantity: 120,
            }
            .to_value(),
            json!({ "category": "Beverages", "quantity": 120 })
        );
        assert_eq!(Answer::Unset.to_value(), Value::Null);
    }

    #[test]
    fn test_structural_emptiness() {
        assert!(Answer::Unset.is_structurally_empty());
        assert!(Answer::Int(0).is_structurally_empty());
        assert!(!Answer::Int(14).is_structurally_empty());
        assert!(Answer::Products(vec![]).is_structurally_empty());
        assert!(Answer::CategoryQuantity {
            category: String::new(),
            quantity: 0,
        }
        .is_structurally_empty());
        assert!(!Answer::CategoryQuantity {
            category: "Beverages".to_string(),
            quantity: 0,
        }
        .is_structurally_empty());
    }

    #[test]
    fn test_rag_only_decision() {
        assert!(rag_only(Some(Route::Rag), "SELECT 1"));
        assert!(rag_only(Some(Route::Rag), ""));
        assert!(rag_only(Some(Route::Sql), ""));
        assert!(rag_only(Some(Route::Hybrid), ""));
        assert!(!rag_only(Some(Route::Sql), "SELECT 1"));
        assert!(!rag_only(Some(Route::Hybrid), "SELECT 1"));
        assert!(rag_only(None, ""));
    }

    #[test]
    fn test_constraints_merge_is_monotonic() {
        let mut constraints = Constraints {
            category: Some("Beverages".to_string()),
            ..Constraints::default()
        };

        let found = Constraints {
            campaign: Some("Summer Beverages 1997".to_string()),
            date_start: NaiveDate::from_ymd_opt(1997, 6, 1),
            date_end: NaiveDate::from_ymd_opt(1997, 6, 30),
            ..Constraints::default()
        };

        constraints.merge(found.clone());
        assert_eq!(constraints.category.as_deref(), Some("Beverages"));
        assert_eq!(constraints.campaign.as_deref(), Some("Summer Beverages 1997"));

        // Re-merging the same discoveries changes nothing.
        let before = constraints.clone();
        constraints.merge(found);
        assert_eq!(constraints, before);
    }

    #[test]
    fn test_record_visit_appends_exactly_one_entry() {
        let mut state = WorkflowState::new("q1", "test question", FormatHint::Int);
        state.record_visit(graph::ROUTER);
        state.record_visit(graph::RETRIEVER);
        assert_eq!(state.trace.len(), 2);
        assert_eq!(state.trace[0].node, graph::ROUTER);
        assert_eq!(state.trace[1].observed, json!({ "docs_found": 0 }));
    }
}
