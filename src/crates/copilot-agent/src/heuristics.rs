//! Keyword-based route classification
//!
//! The deterministic fallback the router node uses when its classifier
//! collaborator fails, and (as [`KeywordClassifier`]) the zero-dependency
//! default classifier for batch runs.

use async_trait::async_trait;

use crate::collab::{CollabError, RouteClassifier};
use crate::state::Route;

/// Words that signal the answer lives in the document corpus.
const DOCS_KEYWORDS: &[&str] = &["policy", "return", "marketing", "calendar", "kpi", "according"];

/// Words that signal the answer needs the transactional data.
const DATA_KEYWORDS: &[&str] = &["revenue", "top", "total", "quantity", "customer", "margin"];

/// Classify a question by keyword: both kinds present → hybrid, documents
/// only → rag, otherwise → sql.
pub fn keyword_route(question: &str) -> Route {
    let q = question.to_lowercase();
    let has_docs = DOCS_KEYWORDS.iter().any(|kw| q.contains(kw));
    let has_data = DATA_KEYWORDS.iter().any(|kw| q.contains(kw));

    match (has_docs, has_data) {
        (true, true) => Route::Hybrid,
        (true, false) => Route::Rag,
        _ => Route::Sql,
    }
}

/// [`RouteClassifier`] backed by [`keyword_route`]. Infallible.
pub struct KeywordClassifier;

#[async_trait]
impl RouteClassifier for KeywordClassifier {
    async fn classify(&self, question: &str) -> Result<Route, CollabError> {
        Ok(keyword_route(question))
    }
}
