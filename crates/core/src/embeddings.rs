use std::sync::{Arc, OnceLock};
use tracing::info;

const DEFAULT: usize = 384;

/// Must match the dimension the vector index was created with.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Embedding model behind the ingestion and query paths. One vector per
/// input text, order preserved, no retry.
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Vec<f32>;

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Hashed character-trigram embedder, L2-normalized. Deterministic and
/// dependency-free, which keeps the pipeline testable end to end; swap in a
/// transformer-backed `Embedder` for production-quality retrieval.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

type SharedEmbedder = Arc<dyn Embedder>;

/// Process-wide handle for the embedding model.
///
/// Model construction can be expensive, so it is deferred until the first
/// request that actually embeds something, and the `OnceLock` guarantees the
/// factory runs at most once even when two requests race on first use. Once
/// built, the instance lives for the process lifetime.
pub struct EmbedderHandle {
    cell: OnceLock<SharedEmbedder>,
    build: Box<dyn Fn() -> SharedEmbedder + Send + Sync>,
}

impl EmbedderHandle {
    pub fn new(build: impl Fn() -> SharedEmbedder + Send + Sync + 'static) -> Self {
        Self {
            cell: OnceLock::new(),
            build: Box::new(build),
        }
    }

    pub fn get(&self) -> &SharedEmbedder {
        self.cell.get_or_init(|| {
            info!("initializing embedding model");
            (self.build)()
        })
    }
}
