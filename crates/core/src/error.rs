use thiserror::Error;

/// Failures while turning an uploaded document into chunk records.
///
/// `Validation` carries a user-readable message and maps to a 400 at the HTTP
/// boundary; `PdfParse` covers well-formed-looking input that still cannot be
/// processed and maps to a 422.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),
}

/// Failures from downstream dependencies: the vector index, the rerank
/// endpoint, or an answer provider. All of these map to a 503.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
