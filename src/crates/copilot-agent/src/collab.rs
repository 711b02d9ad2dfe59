//! Collaborator seams invoked by the workflow nodes
//!
//! The orchestration core treats document ranking, route classification,
//! query generation, query execution, and answer synthesis as replaceable
//! strategies behind these traits. Implementations are constructed
//! explicitly and injected through [`Collaborators`]; there is no ambient
//! process-wide instance of anything.
//!
//! Failures cross these seams as [`CollabError`] values. The node that made
//! the call catches the error, degrades to a deterministic fallback, and
//! records the failure in the workflow state; the engine never sees it.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::state::{Answer, Constraints, DocumentChunk, FormatHint, QueryResult, Route};

/// Error returned by an external collaborator.
#[derive(Debug, Clone, Error)]
pub enum CollabError {
    /// The collaborator ran but could not produce a result.
    #[error("collaborator backend error: {0}")]
    Backend(String),

    /// The collaborator could not be reached or constructed.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Classifies a question into a [`Route`].
#[async_trait]
pub trait RouteClassifier: Send + Sync {
    async fn classify(&self, question: &str) -> Result<Route, CollabError>;
}

/// Ranks document chunks by relevance to a query.
#[async_trait]
pub trait DocumentRanker: Send + Sync {
    /// Top-`top_k` most relevant chunks with nonzero relevance, best
    /// first. May return fewer than `top_k` (or none).
    async fn retrieve(&self, query: &str, top_k: usize)
        -> Result<Vec<DocumentChunk>, CollabError>;
}

/// Derives a data query from a question.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    /// Returns the query text. An empty string means no query is required:
    /// the answer is fully determined by retrieved documents.
    async fn generate(
        &self,
        question: &str,
        schema: &str,
        constraints: &Constraints,
    ) -> Result<String, CollabError>;
}

/// Executes generated queries against the data source.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Schema description handed to the query generator.
    async fn schema(&self) -> Result<String, CollabError>;

    /// Execute `sql`. Execution failures are carried in
    /// [`QueryResult::error`], never raised.
    async fn execute(&self, sql: &str) -> QueryResult;
}

/// Everything the synthesis collaborator gets to look at.
#[derive(Debug)]
pub struct SynthesisRequest<'a> {
    pub question: &'a str,
    pub format_hint: FormatHint,
    pub route: Option<Route>,
    pub docs: &'a [DocumentChunk],
    pub query_result: &'a QueryResult,
    pub constraints: &'a Constraints,
    pub generated_query: &'a str,
}

/// Tagged synthesis outcome.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: Answer,
    /// Heuristic confidence in `[0, 1]`.
    pub confidence: f64,
    pub explanation: String,
    pub citations: BTreeSet<String>,
}

/// Combines documents, query results, and constraints into a final answer.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Synthesis, CollabError>;
}

/// The injected collaborator set handed to graph assembly.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn RouteClassifier>,
    pub ranker: Arc<dyn DocumentRanker>,
    pub generator: Arc<dyn QueryGenerator>,
    pub executor: Arc<dyn QueryExecutor>,
    pub synthesizer: Arc<dyn Synthesizer>,
}
