//! Embedding provider abstraction.
//!
//! This module provides:
//! - `Embedder`: the provider-agnostic seam (embed one text or a batch)
//! - `HashingEmbedder`: local, offline, deterministic backend
//! - `HttpEmbedder`: OpenAI-compatible HTTP backend
//!
//! Providers are interchangeable but not dimension-compatible; the vector
//! store pins dimensionality per workspace and rejects drift.

mod hashing;
mod http;

pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::config::{EmbeddingProviderKind, RagConfig};
use crate::errors::RagError;

/// Converts text into fixed-length vectors.
///
/// Implementations must be deterministic for a fixed configuration and must
/// produce vectors of exactly `dimension()` entries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name (e.g. "hashing", "http").
    fn name(&self) -> &str;

    /// Fixed output dimensionality for this configuration.
    fn dimension(&self) -> usize;

    /// Embed one text. Input must be non-empty; callers truncate to the
    /// provider's maximum length before invoking.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embed a batch, preserving input order in the output.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Builds the embedder selected by the configuration.
pub fn from_config(config: &RagConfig) -> Result<Arc<dyn Embedder>, RagError> {
    match config.provider {
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(
            config.embedding_dimension,
        )?)),
        EmbeddingProviderKind::Http => Ok(Arc::new(HttpEmbedder::new(
            config.embedding_base_url.clone(),
            config.api_key(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?)),
    }
}

static SHARED: OnceCell<Arc<dyn Embedder>> = OnceCell::const_new();

/// Process-wide provider handle: initialized once by the first caller,
/// shared read-only afterwards. First config wins; later callers get the
/// already-built embedder and their `config` is ignored. Wire `from_config`
/// directly in tests instead of going through this.
pub async fn shared(config: &RagConfig) -> Result<Arc<dyn Embedder>, RagError> {
    SHARED
        .get_or_try_init(|| async { from_config(config) })
        .await
        .map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_hashing_provider_by_default() {
        let config = RagConfig::default();
        let embedder = from_config(&config).unwrap();
        assert_eq!(embedder.name(), "hashing");
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn shared_handle_keeps_the_first_configuration() {
        let first = RagConfig {
            embedding_dimension: 48,
            ..RagConfig::default()
        };
        let embedder = shared(&first).await.unwrap();
        assert_eq!(embedder.dimension(), 48);

        let second = RagConfig {
            embedding_dimension: 96,
            ..RagConfig::default()
        };
        let embedder = shared(&second).await.unwrap();
        assert_eq!(embedder.dimension(), 48);
    }

    #[tokio::test]
    async fn default_batch_preserves_input_order() {
        let embedder = from_config(&RagConfig::default()).unwrap();
        let texts = vec!["alpha".to_string(), "beta".to_string()];

        let batch = embedder.embed_batch(&texts).await.unwrap();
        let alpha = embedder.embed("alpha").await.unwrap();
        let beta = embedder.embed("beta").await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], alpha);
        assert_eq!(batch[1], beta);
    }
}
