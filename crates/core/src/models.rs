use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata stored alongside every vector in the index. `chunk_index` is
/// local to the page it came from and resets per page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub text: String,
    pub filename: String,
    pub page_number: u32,
    pub chunk_index: usize,
}

/// One bounded text segment of an uploaded document, the unit of embedding
/// and retrieval. The `id` is deterministic:
/// `"{filename}_{digest12}_chunk_{ordinal}"`, where `digest12` is derived
/// from the raw document bytes and `ordinal` is the global upsert position.
/// Uploads of identical bytes overwrite their own entries; a same-named file
/// with different content gets distinct ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk paired with its embedding, ready for the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One hit returned by the vector index, ordered by descending similarity.
/// Metadata is carried as loose JSON because the index is free to return
/// numeric fields in whatever representation it stores them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    pub id: String,
    pub score: f64,
    pub metadata: Option<Value>,
}

impl SearchMatch {
    /// Stored chunk text, or an empty string when the index returned no
    /// metadata for this entry.
    pub fn text(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.pointer("/text"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Source document echoed back to the caller of the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl From<&SearchMatch> for SourceDocument {
    fn from(hit: &SearchMatch) -> Self {
        Self {
            text: hit.text().to_string(),
            score: Some(hit.score),
            metadata: hit.metadata.clone(),
        }
    }
}

/// Outcome of the answer-generation chain. `error` is set only when every
/// provider and model was exhausted; callers check the field instead of
/// catching anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub text: Option<String>,
    pub error: Option<String>,
    pub fallback_used: bool,
}

/// Knobs for turning one uploaded document into chunk records.
#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Total cleaned text shorter than this is treated as a scanned or
    /// empty document and rejected.
    pub min_document_chars: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            min_document_chars: 10,
        }
    }
}

/// Everything `process_document` produced for one upload. The counters are
/// informational only and never make ingestion fail on their own.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub records: Vec<ChunkRecord>,
    pub page_count: usize,
    pub empty_pages: usize,
    pub ingested_at: DateTime<Utc>,
}

/// Query-path knobs: how many candidates to pull from the index, how many
/// survive reranking, and whether to run answer generation at all.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub retrieve_k: usize,
    pub top_k: usize,
    pub generate: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            retrieve_k: 20,
            top_k: 5,
            generate: true,
        }
    }
}

/// Final response body for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<SourceDocument>,
}
