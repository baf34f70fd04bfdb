use crate::models::{SearchMatch, VectorRecord};
use crate::SearchError;
use async_trait::async_trait;

/// External vector index holding one entry per chunk.
#[async_trait]
pub trait VectorIndex {
    /// Persists records in upsert order. Implementations batch internally;
    /// a failing batch aborts the remainder and propagates, with no rollback
    /// of batches already written (last-write-wins per id on retry).
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), SearchError>;

    /// Nearest-neighbor search, ordered by descending similarity.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchMatch>, SearchError>;

    /// Removes every entry. Maintenance tooling only.
    async fn clear(&self) -> Result<(), SearchError>;
}

/// Cross-encoder scoring backend used by the reranker: one relevance score
/// per candidate text, positionally aligned with the input.
#[async_trait]
pub trait RelevanceScorer {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f64>, SearchError>;
}
