use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use docqa_core::{
    process_document, AnswerChain, AnswerProvider, CharacterNgramEmbedder, ChatCompletionProvider,
    Embedder, EmbedderHandle, HfCrossEncoder, HuggingFaceProvider, IngestError, IngestionOptions,
    PineconeStore, QueryOptions, QueryOrchestrator, QueryOutcome, Reranker, VectorIndex,
    VectorRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::Cli;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

struct AppState {
    index: PineconeStore,
    embedder: Arc<EmbedderHandle>,
    orchestrator: QueryOrchestrator<PineconeStore, HfCrossEncoder>,
    ingestion: IngestionOptions,
}

pub(crate) async fn run(cli: Cli) -> anyhow::Result<()> {
    let embedder = Arc::new(EmbedderHandle::new(|| {
        Arc::new(CharacterNgramEmbedder::default()) as Arc<dyn Embedder>
    }));

    let reranker = Reranker::new(HfCrossEncoder::new(
        cli.huggingface_api_key.clone().unwrap_or_default(),
    )?);

    let providers: Vec<Box<dyn AnswerProvider>> = vec![
        Box::new(ChatCompletionProvider::groq(
            cli.groq_api_key.clone(),
            cli.llm_model.clone(),
        )),
        Box::new(ChatCompletionProvider::openai(
            cli.openai_api_key.clone(),
            cli.llm_model.clone(),
        )),
        Box::new(HuggingFaceProvider::new(
            cli.huggingface_api_key.clone(),
            cli.llm_model.clone(),
        )),
    ];
    let chain = AnswerChain::new(providers, Some(cli.llm_provider.to_lowercase()));

    let orchestrator = QueryOrchestrator::new(
        PineconeStore::new(&cli.pinecone_host, &cli.pinecone_api_key),
        reranker,
        chain,
        embedder.clone(),
        QueryOptions {
            generate: !cli.search_only,
            ..QueryOptions::default()
        },
    );

    let state = Arc::new(AppState {
        index: PineconeStore::new(&cli.pinecone_host, &cli.pinecone_api_key),
        embedder,
        orchestrator,
        ingestion: IngestionOptions::default(),
    });

    let app = Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors_layer(&cli.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    let bind_addr = format!("{}:{}", cli.host, cli.port);
    info!(addr = %bind_addr, search_only = cli.search_only, "listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

// ---- Error responses ----

/// JSON error body `{"detail": "..."}` paired with an HTTP status.
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

fn bad_request(detail: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, detail)
}

// ---- Handlers ----

#[derive(Serialize)]
struct UploadResponse {
    status: &'static str,
    filename: String,
    chunks: usize,
}

async fn handle_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut filename = None;
    let mut bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| bad_request("Failed to read file."))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(str::to_string);
            bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|_| bad_request("Failed to read file."))?,
            );
        }
    }

    let filename = filename.ok_or_else(|| bad_request("Only PDF files are supported."))?;
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(bad_request("Only PDF files are supported."));
    }
    let bytes = bytes.ok_or_else(|| bad_request("Failed to read file."))?;

    let report = process_document(&bytes, &filename, &state.ingestion).map_err(|e| match e {
        IngestError::Validation(message) => {
            warn!(%filename, %message, "ingestion validation failed");
            ApiError::new(StatusCode::BAD_REQUEST, message)
        }
        IngestError::PdfParse(details) => {
            error!(%filename, %details, "pdf processing failed");
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "PDF processing failed.")
        }
    })?;

    if report.records.is_empty() {
        return Err(bad_request(
            "The PDF appears to be empty or image-only. Use a text-based PDF.",
        ));
    }

    let texts: Vec<String> = report
        .records
        .iter()
        .map(|record| record.text.clone())
        .collect();
    let embeddings = state.embedder.get().embed_batch(&texts);
    let vectors: Vec<VectorRecord> = report
        .records
        .iter()
        .zip(embeddings)
        .map(|(record, values)| VectorRecord {
            id: record.id.clone(),
            values,
            metadata: record.metadata.clone(),
        })
        .collect();

    state.index.upsert(&vectors).await.map_err(|e| {
        error!(%filename, error = %e, "vector upsert failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Document indexing failed. Try again later.",
        )
    })?;

    info!(
        %filename,
        chunks = vectors.len(),
        empty_pages = report.empty_pages,
        "document uploaded"
    );

    Ok(Json(UploadResponse {
        status: "success",
        filename,
        chunks: vectors.len(),
    }))
}

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

async fn handle_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryOutcome>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let outcome = state.orchestrator.answer(&request.query).await.map_err(|e| {
        error!(error = %e, "query failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Search failed: {e}"),
        )
    })?;

    Ok(Json(outcome))
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
