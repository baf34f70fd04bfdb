use crate::models::SearchMatch;
use crate::traits::RelevanceScorer;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_RERANK_ENDPOINT: &str =
    "https://router.huggingface.co/hf-inference/models/cross-encoder/ms-marco-MiniLM-L-6-v2";

/// The scoring call is the only external call in the system with a timeout.
pub const RERANK_TIMEOUT: Duration = Duration::from_secs(30);

/// HuggingFace cross-encoder endpoint: one request carrying the query and
/// every candidate text, one score back per candidate.
pub struct HfCrossEncoder {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl HfCrossEncoder {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SearchError> {
        Self::with_endpoint(api_key, DEFAULT_RERANK_ENDPOINT)
    }

    pub fn with_endpoint(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(RERANK_TIMEOUT).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl RelevanceScorer for HfCrossEncoder {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f64>, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "inputs": {
                    "source_sentence": query,
                    "sentences": texts,
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "rerank".to_string(),
                details: response.status().to_string(),
            });
        }

        let scores: Vec<f64> = response.json().await?;
        Ok(scores)
    }
}

/// Reranked candidates, with an explicit discriminant so callers can tell a
/// scored ordering from a degraded pass-through without catching anything.
#[derive(Debug, Clone, PartialEq)]
pub enum RerankOutcome {
    /// Scoring succeeded; candidates re-scored and sorted by descending
    /// relevance, truncated to `top_k`.
    Scored(Vec<SearchMatch>),
    /// Scoring failed; the first `top_k` candidates in their original order,
    /// scores untouched.
    Degraded(Vec<SearchMatch>),
}

impl RerankOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RerankOutcome::Degraded(_))
    }

    pub fn into_matches(self) -> Vec<SearchMatch> {
        match self {
            RerankOutcome::Scored(matches) | RerankOutcome::Degraded(matches) => matches,
        }
    }
}

/// Reorders retrieval candidates by cross-encoder relevance.
///
/// Degrade-never-fail: any scorer error, and any score array whose length
/// does not match the candidate count, turns into a logged pass-through of
/// the original vector ordering. Nothing escapes this component.
pub struct Reranker<S> {
    scorer: S,
}

impl<S: RelevanceScorer> Reranker<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    pub async fn rerank(
        &self,
        query: &str,
        documents: Vec<SearchMatch>,
        top_k: usize,
    ) -> RerankOutcome {
        if documents.is_empty() {
            return RerankOutcome::Scored(Vec::new());
        }

        let texts: Vec<String> = documents
            .iter()
            .map(|document| document.text().to_string())
            .collect();

        match self.scorer.score(query, &texts).await {
            Ok(scores) if scores.len() == documents.len() => {
                let mut scored: Vec<SearchMatch> = documents
                    .into_iter()
                    .zip(scores)
                    .map(|(mut document, score)| {
                        document.score = score;
                        document
                    })
                    .collect();
                scored.sort_by(|left, right| right.score.total_cmp(&left.score));
                scored.truncate(top_k);
                RerankOutcome::Scored(scored)
            }
            Ok(scores) => {
                warn!(
                    expected = documents.len(),
                    got = scores.len(),
                    "rerank score count mismatch; keeping vector order"
                );
                RerankOutcome::Degraded(truncated(documents, top_k))
            }
            Err(error) => {
                warn!(%error, "rerank unavailable; keeping vector order");
                RerankOutcome::Degraded(truncated(documents, top_k))
            }
        }
    }
}

fn truncated(mut documents: Vec<SearchMatch>, top_k: usize) -> Vec<SearchMatch> {
    documents.truncate(top_k);
    documents
}

#[cfg(test)]
mod tests {
    use super::{Reranker, RerankOutcome};
    use crate::models::SearchMatch;
    use crate::traits::RelevanceScorer;
    use crate::SearchError;
    use async_trait::async_trait;
    use serde_json::json;

    enum FakeScorer {
        Scores(Vec<f64>),
        Fails,
    }

    #[async_trait]
    impl RelevanceScorer for FakeScorer {
        async fn score(&self, _query: &str, _texts: &[String]) -> Result<Vec<f64>, SearchError> {
            match self {
                FakeScorer::Scores(scores) => Ok(scores.clone()),
                FakeScorer::Fails => Err(SearchError::Request("scoring endpoint down".into())),
            }
        }
    }

    fn matches(count: usize) -> Vec<SearchMatch> {
        (0..count)
            .map(|index| SearchMatch {
                id: format!("chunk-{index}"),
                score: 1.0 - index as f64 * 0.1,
                metadata: Some(json!({ "text": format!("candidate {index}") })),
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let reranker = Reranker::new(FakeScorer::Fails);
        let outcome = reranker.rerank("q", Vec::new(), 5).await;
        assert_eq!(outcome, RerankOutcome::Scored(Vec::new()));
    }

    #[tokio::test]
    async fn success_sorts_by_descending_score_and_truncates() {
        let reranker = Reranker::new(FakeScorer::Scores(vec![0.1, 0.9, 0.5, 0.7]));
        let outcome = reranker.rerank("q", matches(4), 2).await;

        assert!(!outcome.is_degraded());
        let hits = outcome.into_matches();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "chunk-1");
        assert_eq!(hits[0].score, 0.9);
        assert_eq!(hits[1].id, "chunk-3");
    }

    #[tokio::test]
    async fn scorer_failure_degrades_to_original_order() {
        let reranker = Reranker::new(FakeScorer::Fails);
        let outcome = reranker.rerank("q", matches(8), 5).await;

        assert!(outcome.is_degraded());
        let hits = outcome.into_matches();
        assert_eq!(hits.len(), 5);
        for (index, hit) in hits.iter().enumerate() {
            assert_eq!(hit.id, format!("chunk-{index}"));
        }
        // Original vector scores untouched.
        assert_eq!(hits[0].score, 1.0);
    }

    #[tokio::test]
    async fn score_count_mismatch_degrades_too() {
        let reranker = Reranker::new(FakeScorer::Scores(vec![0.4, 0.2]));
        let outcome = reranker.rerank("q", matches(3), 5).await;

        assert!(outcome.is_degraded());
        let hits = outcome.into_matches();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[2].id, "chunk-2");
    }

    #[tokio::test]
    async fn fewer_documents_than_top_k_keeps_them_all() {
        let reranker = Reranker::new(FakeScorer::Scores(vec![0.3, 0.6]));
        let outcome = reranker.rerank("q", matches(2), 5).await;
        assert_eq!(outcome.into_matches().len(), 2);
    }
}
