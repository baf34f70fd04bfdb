pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod rerank;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod test_pdf;

pub use chunking::{chunk_text, clean_page_text, ChunkingConfig};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbedderHandle, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, SearchError};
pub use extractor::{extract_page_texts, PageText};
pub use ingest::process_document;
pub use llm::{
    AnswerChain, AnswerProvider, ChatCompletionProvider, ChatMessage, HuggingFaceProvider,
};
pub use models::{
    Answer, ChunkMetadata, ChunkRecord, IngestionOptions, IngestionReport, QueryOptions,
    QueryOutcome, SearchMatch, SourceDocument, VectorRecord,
};
pub use orchestrator::{format_search_results, QueryOrchestrator, NO_MATCH_ANSWER};
pub use rerank::{HfCrossEncoder, Reranker, RerankOutcome, RERANK_TIMEOUT};
pub use stores::PineconeStore;
pub use traits::{RelevanceScorer, VectorIndex};
