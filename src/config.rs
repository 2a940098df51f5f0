//! Configuration surface for the RAG core.
//!
//! Defaults mirror the deployed setup: 1000/200 chunking, 384-dimension
//! embeddings, top-5 retrieval, 50k character source cap.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::RagError;

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// Local deterministic feature-hashing embedder. Offline, no credentials.
    Hashing,
    /// OpenAI-compatible HTTP embeddings endpoint.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub provider: EmbeddingProviderKind,
    /// Must match what the configured provider actually produces.
    pub embedding_dimension: usize,
    /// Model id sent to HTTP providers. Ignored by the hashing backend.
    pub embedding_model: String,
    /// Base URL for HTTP providers, e.g. "http://localhost:1234".
    pub embedding_base_url: String,
    /// Name of the environment variable holding the provider API key.
    pub api_key_env: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Default top-K for retrieval.
    pub retrieval_limit: usize,
    /// Extracted source text is truncated to this many characters before
    /// chunking, bounding worst-case embedding cost.
    pub max_source_chars: usize,
    /// Bounded retries for transient embedding failures during ingestion.
    pub max_embed_retries: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Hashing,
            embedding_dimension: 384,
            embedding_model: "all-minilm-l6-v2".to_string(),
            embedding_base_url: "http://localhost:1234".to_string(),
            api_key_env: "STUDYRAG_API_KEY".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            retrieval_limit: 5,
            max_source_chars: 50_000,
            max_embed_retries: 3,
        }
    }
}

impl RagConfig {
    /// Load configuration from a JSON file, falling back to defaults for
    /// any missing field.
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RagError::InvalidInput(format!("config read failed: {e}")))?;
        let config: RagConfig = serde_json::from_str(&raw)
            .map_err(|e| RagError::InvalidInput(format!("config parse failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// API key resolved from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), RagError> {
        validate_range("embedding_dimension", self.embedding_dimension, 1, 16_384)?;
        validate_range("chunk_size", self.chunk_size, 1, 1_000_000)?;
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        validate_range("retrieval_limit", self.retrieval_limit, 1, 1_000)?;
        validate_range("max_source_chars", self.max_source_chars, 1, 10_000_000)?;
        validate_range("max_embed_retries", self.max_embed_retries, 1, 100)?;
        if self.provider == EmbeddingProviderKind::Http && self.embedding_base_url.trim().is_empty()
        {
            return Err(RagError::InvalidInput(
                "embedding_base_url is required for the http provider".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_range(field: &str, value: usize, min: usize, max: usize) -> Result<(), RagError> {
    if value < min || value > max {
        return Err(RagError::InvalidInput(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        RagConfig::default().validate().unwrap();
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let config = RagConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RagError::InvalidInput(_))));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "chunk_size": 500, "chunk_overlap": 50 }}"#).unwrap();

        let config = RagConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.retrieval_limit, 5);
    }

    #[test]
    fn invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "chunk_size": 0 }}"#).unwrap();
        assert!(RagConfig::from_file(file.path()).is_err());
    }
}
