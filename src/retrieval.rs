//! Retrieval service: query in, ranked context out.
//!
//! Embeds the question, runs a workspace-scoped similarity search, and
//! assembles the context bundle handed to the answer-generation
//! collaborator. An empty workspace is an explicit `NoContext` signal so
//! callers can respond "upload a document first" instead of generating
//! from nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RagConfig;
use crate::embedding::Embedder;
use crate::errors::RagError;
use crate::store::VectorStore;

/// One retrieved chunk with its provenance and similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextChunk {
    pub content: String,
    pub file_name: String,
    pub similarity: f32,
}

/// Ranked context for one question. Never empty; an empty match set is
/// surfaced as `RagError::NoContext` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBundle {
    pub chunks: Vec<ContextChunk>,
}

impl ContextBundle {
    /// Renders the bundle as the context string handed to the
    /// answer-generation collaborator.
    pub fn format_context(&self) -> String {
        self.chunks
            .iter()
            .map(|chunk| format!("[Source: {}]\n{}", chunk.file_name, chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Distinct source file names, in rank order.
    pub fn sources(&self) -> Vec<String> {
        let mut sources = Vec::new();
        for chunk in &self.chunks {
            if !sources.contains(&chunk.file_name) {
                sources.push(chunk.file_name.clone());
            }
        }
        sources
    }
}

pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: RagConfig,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: RagConfig,
    ) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self {
            embedder,
            store,
            config,
        })
    }

    /// Retrieves the top-`limit` chunks for `query` within one workspace.
    /// `limit` falls back to the configured default when `None`.
    pub async fn retrieve(
        &self,
        query: &str,
        workspace_id: i64,
        limit: Option<usize>,
    ) -> Result<ContextBundle, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }
        let limit = limit.unwrap_or(self.config.retrieval_limit);

        let query_vector = self.embedder.embed(query).await?;
        let hits = self.store.search(&query_vector, workspace_id, limit).await?;
        debug!(workspace = workspace_id, hits = hits.len(), "retrieval search");

        if hits.is_empty() {
            return Err(RagError::NoContext(workspace_id));
        }

        Ok(ContextBundle {
            chunks: hits
                .into_iter()
                .map(|hit| ContextChunk {
                    content: hit.chunk.content,
                    file_name: hit.chunk.file_name,
                    similarity: hit.similarity,
                })
                .collect(),
        })
    }
}
