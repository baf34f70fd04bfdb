mod server;

use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa-server", version)]
pub(crate) struct Cli {
    /// Bind host
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Pinecone data-plane host of the index, e.g.
    /// https://docs-abc123.svc.us-east-1.pinecone.io
    #[arg(long, env = "PINECONE_HOST")]
    pub pinecone_host: String,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY")]
    pub pinecone_api_key: String,

    /// HuggingFace API key (rerank endpoint and the hf answer provider)
    #[arg(long, env = "HUGGINGFACE_API_KEY")]
    pub huggingface_api_key: Option<String>,

    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY")]
    pub groq_api_key: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,

    /// Answer provider tried first; the others stay as fallbacks
    #[arg(long, env = "LLM_PROVIDER", default_value = "groq")]
    pub llm_provider: String,

    /// Explicit model override; skips the per-provider fallback lists
    #[arg(long, env = "LLM_MODEL")]
    pub llm_model: Option<String>,

    /// Comma-separated allowed CORS origins; permissive when empty
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        default_value = "http://localhost:5173,http://localhost:3000"
    )]
    pub allowed_origins: String,

    /// Serve formatted search results instead of generated answers
    #[arg(long, default_value_t = false)]
    pub search_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "docqa-server boot"
    );

    server::run(cli).await
}
