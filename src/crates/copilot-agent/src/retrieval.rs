//! TF-IDF document retrieval
//!
//! Indexes a directory of markdown documents, paragraph-chunked, and ranks
//! chunks against a query by cosine similarity over TF-IDF vectors. The
//! index is built once at construction and is immutable afterwards;
//! construct one per corpus and inject it wherever a
//! [`DocumentRanker`](crate::collab::DocumentRanker) is needed.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::collab::{CollabError, DocumentRanker};
use crate::state::DocumentChunk;

/// Common English words excluded from the index.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "how", "in",
    "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "what",
    "when", "which", "who", "will", "with",
];

struct IndexedChunk {
    id: String,
    source: String,
    content: String,
    /// L2-normalized sparse TF-IDF vector, keyed by term index.
    vector: HashMap<usize, f64>,
}

/// TF-IDF index over a chunked document corpus.
pub struct TfIdfRetriever {
    chunks: Vec<IndexedChunk>,
    terms: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfRetriever {
    /// Index every `*.md` file in `dir`.
    ///
    /// Files are visited in name order and split into chunks on blank
    /// lines, so chunk ids (`<stem>::chunk<N>`) are stable across runs.
    pub fn from_dir(dir: impl AsRef<Path>) -> io::Result<Self> {
        let mut documents = Vec::new();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            documents.push((name, content));
        }

        Ok(Self::from_documents(documents))
    }

    /// Index in-memory documents as `(file name, content)` pairs.
    pub fn from_documents(documents: Vec<(String, String)>) -> Self {
        let mut chunks = Vec::new();
        for (source, content) in &documents {
            let stem = source.strip_suffix(".md").unwrap_or(source);
            for (i, section) in content.split("\n\n").enumerate() {
                let section = section.trim();
                if section.is_empty() {
                    continue;
                }
                chunks.push((
                    format!("{stem}::chunk{i}"),
                    source.clone(),
                    section.to_string(),
                ));
            }
        }

        Self::index(chunks)
    }

    fn index(raw: Vec<(String, String, String)>) -> Self {
        let tokenized: Vec<Vec<String>> = raw.iter().map(|(_, _, c)| tokenize(c)).collect();

        // Vocabulary and document frequencies.
        let mut terms: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen: Vec<usize> = Vec::new();
            for token in tokens {
                let idx = *terms.entry(token.clone()).or_insert_with(|| {
                    doc_freq.push(0);
                    doc_freq.len() - 1
                });
                if !seen.contains(&idx) {
                    doc_freq[idx] += 1;
                    seen.push(idx);
                }
            }
        }

        // Smoothed inverse document frequencies.
        let n = raw.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let chunks = raw
            .into_iter()
            .zip(tokenized)
            .map(|((id, source, content), tokens)| IndexedChunk {
                id,
                source,
                content,
                vector: vectorize(&tokens, &terms, &idf),
            })
            .collect();

        Self { chunks, terms, idf }
    }

    /// Rank the indexed chunks against `query`, best first; only chunks
    /// with nonzero similarity are returned.
    pub fn rank(&self, query: &str, top_k: usize) -> Vec<DocumentChunk> {
        let query_vector = vectorize(&tokenize(query), &self.terms, &self.idf);
        if query_vector.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (cosine(&query_vector, &chunk.vector), i))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(top_k)
            .map(|(score, i)| {
                let chunk = &self.chunks[i];
                DocumentChunk {
                    id: chunk.id.clone(),
                    source: chunk.source.clone(),
                    content: chunk.content.clone(),
                    score,
                }
            })
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl DocumentRanker for TfIdfRetriever {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<DocumentChunk>, CollabError> {
        Ok(self.rank(query, top_k))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 1 && !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Sparse, L2-normalized TF-IDF vector for one token sequence.
fn vectorize(tokens: &[String], terms: &HashMap<String, usize>, idf: &[f64]) -> HashMap<usize, f64> {
    let mut counts: HashMap<usize, f64> = HashMap::new();
    for token in tokens {
        if let Some(&idx) = terms.get(token) {
            *counts.entry(idx).or_insert(0.0) += 1.0;
        }
    }

    for (idx, weight) in counts.iter_mut() {
        *weight *= idf[*idx];
    }

    let norm = counts.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in counts.values_mut() {
            *weight /= norm;
        }
    }
    counts
}

fn cosine(a: &HashMap<usize, f64>, b: &HashMap<usize, f64>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(idx, wa)| large.get(idx).map(|wb| wa * wb))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_retriever() -> TfIdfRetriever {
        TfIdfRetriever::from_documents(vec![
            (
                "product_policy.md".to_string(),
                "# Return Policy\n\nBeverages unopened: 14 days after purchase.\n\n\
                 Produce unopened: 5 days after purchase."
                    .to_string(),
            ),
            (
                "marketing_calendar.md".to_string(),
                "# Campaigns\n\nSummer Beverages 1997 ran June 1-30, 1997.\n\n\
                 Winter Classics 1997 ran December 1-31, 1997."
                    .to_string(),
            ),
        ])
    }

    #[test]
    fn test_paragraph_chunking() {
        let retriever = sample_retriever();
        assert_eq!(retriever.chunk_count(), 6);
    }

    #[test]
    fn test_relevant_chunk_ranks_first() {
        let retriever = sample_retriever();
        let results = retriever.rank("return policy for unopened beverages", 3);
        assert!(!results.is_empty());
        assert!(results[0].content.contains("Beverages unopened: 14 days"));
        assert!(results[0].score > 0.0);
        assert_eq!(results[0].source, "product_policy.md");
    }

    #[test]
    fn test_irrelevant_query_returns_nothing() {
        let retriever = sample_retriever();
        let results = retriever.rank("quarterly payroll taxes", 3);
        assert!(results.is_empty());
    }

    #[test]
    fn test_top_k_is_respected() {
        let retriever = sample_retriever();
        let results = retriever.rank("unopened days after purchase", 1);
        assert!(results.len() <= 1);
    }

    #[test]
    fn test_chunk_ids_are_stable() {
        let a = sample_retriever();
        let b = sample_retriever();
        let ra = a.rank("beverages", 3);
        let rb = b.rank("beverages", 3);
        let ids_a: Vec<_> = ra.iter().map(|c| &c.id).collect();
        let ids_b: Vec<_> = rb.iter().map(|c| &c.id).collect();
        assert_eq!(ids_a, ids_b);
    }
}
