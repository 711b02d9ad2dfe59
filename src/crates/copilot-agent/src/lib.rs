//! # copilot-agent - Retail Analytics Copilot
//!
//! Answers analytic questions over a retail dataset by combining document
//! retrieval, query generation and execution, and answer synthesis,
//! orchestrated as a directed workflow with conditional branching and a
//! bounded repair loop on top of [`flowgraph_core`].
//!
//! ## Architecture
//!
//! - [`state`]: the [`WorkflowState`](state::WorkflowState) record
//!   threaded through every node, with closed enums for routes, format
//!   hints, and answers.
//! - [`collab`]: the replaceable strategy seams (classification, ranking,
//!   query generation, query execution, synthesis), injected as a
//!   [`Collaborators`](collab::Collaborators) bundle.
//! - [`nodes`] / [`graph`]: the eight workflow nodes, the condition
//!   functions, and [`build_graph`](graph::build_graph).
//! - [`heuristics`], [`extract`], [`templates`], [`retrieval`],
//!   [`sqlite`], [`synthesis`]: the deterministic default strategies used
//!   for batch runs and as in-node fallbacks.
//! - [`validate`]: the pure answer validity check driving the repair
//!   loop.
//! - [`batch`]: JSONL-shaped question/answer records and the sequential
//!   batch driver.
//!
//! ## Failure model
//!
//! Collaborator failures never escape a node: every node catches them and
//! degrades (keyword routing, empty query, error-carrying query result,
//! last-known answer). A run always terminates with a best-effort answer,
//! a confidence score, and whatever failure reasons the validator left in
//! place; callers inspect those rather than relying on run success. The
//! only aborting error class is a graph wiring defect, surfaced as
//! [`GraphError::Configuration`](flowgraph_core::GraphError::Configuration).

pub mod batch;
pub mod collab;
pub mod extract;
pub mod graph;
pub mod heuristics;
pub mod nodes;
pub mod retrieval;
pub mod sqlite;
pub mod state;
pub mod synthesis;
pub mod templates;
pub mod validate;

pub use batch::{run_batch, AnswerRecord, QuestionRecord};
pub use collab::{
    CollabError, Collaborators, DocumentRanker, QueryExecutor, QueryGenerator, RouteClassifier,
    Synthesis, SynthesisRequest, Synthesizer,
};
pub use graph::{build_graph, REPAIR_LIMIT, TOP_K};
pub use heuristics::KeywordClassifier;
pub use retrieval::TfIdfRetriever;
pub use sqlite::SqliteExecutor;
pub use state::{
    rag_only, Answer, Constraints, DocumentChunk, FormatHint, QueryResult, Route, TraceEntry,
    WorkflowState,
};
pub use synthesis::DeterministicSynthesizer;
pub use templates::TemplateSqlGenerator;
