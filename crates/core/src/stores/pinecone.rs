use crate::models::{SearchMatch, VectorRecord};
use crate::traits::VectorIndex;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

/// Vectors are written in fixed-size batches, one request at a time.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Pinecone-backed vector index, addressed via its per-index data-plane host.
pub struct PineconeStore {
    host: String,
    api_key: String,
    client: Client,
}

impl PineconeStore {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl VectorIndex for PineconeStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), SearchError> {
        for (batch_no, batch) in records.chunks(UPSERT_BATCH_SIZE).enumerate() {
            let vectors = batch
                .iter()
                .map(|record| {
                    Ok(json!({
                        "id": record.id,
                        "values": record.values,
                        "metadata": serde_json::to_value(&record.metadata)?,
                    }))
                })
                .collect::<Result<Vec<_>, SearchError>>()?;

            let response = self
                .client
                .post(format!("{}/vectors/upsert", self.host))
                .header("Api-Key", &self.api_key)
                .json(&json!({ "vectors": vectors }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(SearchError::BackendResponse {
                    backend: "pinecone".to_string(),
                    details: response.status().to_string(),
                });
            }

            debug!(batch = batch_no + 1, size = batch.len(), "upserted vector batch");
        }

        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchMatch>, SearchError> {
        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .json(&json!({
                "vector": vector,
                "topK": k,
                "includeMetadata": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/matches")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let id = hit
                .pointer("/id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
            let metadata = hit.pointer("/metadata").cloned();

            result.push(SearchMatch {
                id,
                score,
                metadata,
            });
        }

        Ok(result)
    }

    async fn clear(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .post(format!("{}/vectors/delete", self.host))
            .header("Api-Key", &self.api_key)
            .json(&json!({ "deleteAll": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}
