//! Vector store abstraction.
//!
//! Persists chunks with their embeddings and answers workspace-scoped
//! nearest-neighbor queries. The workspace id is a mandatory parameter on
//! every operation; scoping is enforced here, not by caller discipline.

mod sqlite;

pub use sqlite::SqliteVectorStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RagError;

pub type ChunkId = i64;

/// A persisted chunk. Write-once: created by ingestion, destroyed only by
/// workspace deletion, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: ChunkId,
    pub owner_user_id: i64,
    pub workspace_id: i64,
    pub file_name: String,
    pub file_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Insert form of a chunk; the id is assigned at persistence time.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub owner_user_id: i64,
    pub workspace_id: i64,
    pub file_name: String,
    pub file_url: Option<String>,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// One search result with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: StoredChunk,
    pub similarity: f32,
}

/// One ingested document, summarized per workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub file_name: String,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Abstract storage backend for chunks and similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persists one chunk. The first chunk in a workspace pins that
    /// workspace's embedding dimensionality; later inserts must match or
    /// fail with `DimensionMismatch`.
    async fn insert(&self, chunk: NewChunk) -> Result<ChunkId, RagError>;

    /// Returns up to `limit` chunks of `workspace_id` ordered by descending
    /// cosine similarity; ties broken by insertion order. An empty workspace
    /// yields an empty vec. `limit` must be at least 1; zero is rejected
    /// with `InvalidInput`.
    async fn search(
        &self,
        query: &[f32],
        workspace_id: i64,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RagError>;

    /// Removes all chunks for a workspace. Idempotent.
    async fn delete_by_workspace(&self, workspace_id: i64) -> Result<usize, RagError>;

    /// Number of chunks stored for a workspace.
    async fn count(&self, workspace_id: i64) -> Result<usize, RagError>;

    /// Distinct documents ingested into a workspace, newest first.
    async fn list_documents(&self, workspace_id: i64) -> Result<Vec<DocumentEntry>, RagError>;
}
