use crate::embeddings::EmbedderHandle;
use crate::llm::AnswerChain;
use crate::models::{QueryOptions, QueryOutcome, SearchMatch, SourceDocument};
use crate::rerank::Reranker;
use crate::traits::{RelevanceScorer, VectorIndex};
use crate::SearchError;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

pub const NO_MATCH_ANSWER: &str = "No relevant information found.";

/// Composes the query path: embed -> vector search -> rerank -> answer
/// generation, degrading to a formatted search-results answer when every
/// provider is exhausted or when generation is switched off.
pub struct QueryOrchestrator<V, S> {
    index: V,
    reranker: Reranker<S>,
    chain: AnswerChain,
    embedder: Arc<EmbedderHandle>,
    options: QueryOptions,
}

impl<V, S> QueryOrchestrator<V, S>
where
    V: VectorIndex + Send + Sync,
    S: RelevanceScorer + Send + Sync,
{
    pub fn new(
        index: V,
        reranker: Reranker<S>,
        chain: AnswerChain,
        embedder: Arc<EmbedderHandle>,
        options: QueryOptions,
    ) -> Self {
        Self {
            index,
            reranker,
            chain,
            embedder,
            options,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<QueryOutcome, SearchError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SearchError::Request("query is empty".to_string()));
        }

        let query_vector = self.embedder.get().embed(question);
        let candidates = self
            .index
            .search(&query_vector, self.options.retrieve_k)
            .await?;
        debug!(candidates = candidates.len(), "vector search finished");

        if candidates.is_empty() {
            return Ok(QueryOutcome {
                answer: NO_MATCH_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let reranked = self
            .reranker
            .rerank(question, candidates, self.options.top_k)
            .await;
        if reranked.is_degraded() {
            debug!("serving vector ordering; rerank degraded");
        }
        let top = reranked.into_matches();
        let sources: Vec<SourceDocument> = top.iter().map(SourceDocument::from).collect();

        let answer = if self.options.generate {
            let context = top.iter().map(SearchMatch::text).collect::<Vec<_>>().join("\n\n");
            let generated = self.chain.generate_answer(question, &context).await;
            match generated.text {
                Some(text) => text,
                None => {
                    warn!("answer generation exhausted all providers; serving search results");
                    format_search_results(&top)
                }
            }
        } else {
            format_search_results(&top)
        };

        Ok(QueryOutcome { answer, sources })
    }
}

/// The no-generation rendering: retrieved chunks presented as a readable
/// results list, packaged in the `answer` field.
pub fn format_search_results(hits: &[SearchMatch]) -> String {
    let mut formatted = String::from("### 🔍 Top Search Results\n\n");
    for (position, hit) in hits.iter().enumerate() {
        let text = match hit.text() {
            "" => "No text content",
            text => text,
        };
        let _ = write!(
            formatted,
            "**Result {}** (Score: {:.2}):\n> {}\n\n---\n\n",
            position + 1,
            hit.score,
            text
        );
    }
    formatted
}
