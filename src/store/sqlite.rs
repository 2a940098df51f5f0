//! SQLite-backed vector store.
//!
//! Chunks and their embeddings live in one table; a side table pins the
//! embedding dimensionality established by the first insert into each
//! workspace. Search is a brute-force cosine scan within the workspace
//! filter; the store owns the similarity expression and the scoping, index
//! maintenance belongs to the storage engine.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{ChunkId, DocumentEntry, NewChunk, SearchHit, StoredChunk, VectorStore};
use crate::errors::RagError;
use crate::vector_math::rank_descending_by_cosine;

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(RagError::storage)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_user_id INTEGER NOT NULL,
                workspace_id INTEGER NOT NULL,
                file_name TEXT NOT NULL,
                file_url TEXT,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::storage)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_workspace ON chunks(workspace_id)")
            .execute(&self.pool)
            .await
            .map_err(RagError::storage)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS workspace_embeddings (
                workspace_id INTEGER PRIMARY KEY,
                dimension INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::storage)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<StoredChunk, RagError> {
        let created_at: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(RagError::storage)?
            .with_timezone(&Utc);

        Ok(StoredChunk {
            id: row.get("id"),
            owner_user_id: row.get("owner_user_id"),
            workspace_id: row.get("workspace_id"),
            file_name: row.get("file_name"),
            file_url: row.get("file_url"),
            content: row.get("content"),
            created_at,
        })
    }

    async fn pinned_dimension(&self, workspace_id: i64) -> Result<Option<usize>, RagError> {
        let dimension: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM workspace_embeddings WHERE workspace_id = ?1")
                .bind(workspace_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RagError::storage)?;
        Ok(dimension.map(|d| d as usize))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, chunk: NewChunk) -> Result<ChunkId, RagError> {
        if chunk.content.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "chunk content must not be empty".to_string(),
            ));
        }
        if chunk.embedding.is_empty() {
            return Err(RagError::InvalidInput(
                "chunk embedding must not be empty".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;

        // First insert into a workspace establishes its dimensionality.
        sqlx::query(
            "INSERT OR IGNORE INTO workspace_embeddings (workspace_id, dimension) VALUES (?1, ?2)",
        )
        .bind(chunk.workspace_id)
        .bind(chunk.embedding.len() as i64)
        .execute(&mut *tx)
        .await
        .map_err(RagError::storage)?;

        let pinned: i64 =
            sqlx::query_scalar("SELECT dimension FROM workspace_embeddings WHERE workspace_id = ?1")
                .bind(chunk.workspace_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(RagError::storage)?;

        if pinned as usize != chunk.embedding.len() {
            return Err(RagError::DimensionMismatch {
                workspace_id: chunk.workspace_id,
                expected: pinned as usize,
                actual: chunk.embedding.len(),
            });
        }

        let blob = Self::serialize_embedding(&chunk.embedding);
        let created_at = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO chunks (owner_user_id, workspace_id, file_name, file_url, content, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(chunk.owner_user_id)
        .bind(chunk.workspace_id)
        .bind(&chunk.file_name)
        .bind(chunk.file_url.as_deref())
        .bind(&chunk.content)
        .bind(&blob)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(RagError::storage)?;

        tx.commit().await.map_err(RagError::storage)?;
        Ok(result.last_insert_rowid())
    }

    async fn search(
        &self,
        query: &[f32],
        workspace_id: i64,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        if limit == 0 {
            return Err(RagError::InvalidInput(
                "search limit must be at least 1".to_string(),
            ));
        }
        let Some(pinned) = self.pinned_dimension(workspace_id).await? else {
            return Ok(Vec::new());
        };
        if query.len() != pinned {
            return Err(RagError::DimensionMismatch {
                workspace_id,
                expected: pinned,
                actual: query.len(),
            });
        }

        // Insertion order here plus a stable sort gives deterministic
        // tie-breaking on equal similarity.
        let rows = sqlx::query(
            "SELECT id, owner_user_id, workspace_id, file_name, file_url, content, embedding, created_at
             FROM chunks
             WHERE workspace_id = ?1
             ORDER BY id ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::storage)?;

        let embeddings: Vec<Vec<f32>> = rows
            .iter()
            .map(|row| {
                let bytes: Vec<u8> = row.get("embedding");
                Self::deserialize_embedding(&bytes)
            })
            .collect();

        let ranked = rank_descending_by_cosine(query, &embeddings)?;
        ranked
            .into_iter()
            .take(limit)
            .map(|(idx, similarity)| {
                Ok(SearchHit {
                    chunk: Self::row_to_chunk(&rows[idx])?,
                    similarity,
                })
            })
            .collect()
    }

    async fn delete_by_workspace(&self, workspace_id: i64) -> Result<usize, RagError> {
        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;

        let result = sqlx::query("DELETE FROM chunks WHERE workspace_id = ?1")
            .bind(workspace_id)
            .execute(&mut *tx)
            .await
            .map_err(RagError::storage)?;

        // The dimensionality pin goes with the chunks so a re-created
        // workspace can start fresh under a new provider.
        sqlx::query("DELETE FROM workspace_embeddings WHERE workspace_id = ?1")
            .bind(workspace_id)
            .execute(&mut *tx)
            .await
            .map_err(RagError::storage)?;

        tx.commit().await.map_err(RagError::storage)?;
        Ok(result.rows_affected() as usize)
    }

    async fn count(&self, workspace_id: i64) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE workspace_id = ?1")
            .bind(workspace_id)
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::storage)?;
        Ok(count as usize)
    }

    async fn list_documents(&self, workspace_id: i64) -> Result<Vec<DocumentEntry>, RagError> {
        let rows = sqlx::query(
            "SELECT file_name, file_url, MIN(created_at) AS created_at
             FROM chunks
             WHERE workspace_id = ?1
             GROUP BY file_name, file_url
             ORDER BY created_at DESC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::storage)?;

        rows.iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(RagError::storage)?
                    .with_timezone(&Utc);
                Ok(DocumentEntry {
                    file_name: row.get("file_name"),
                    file_url: row.get("file_url"),
                    created_at,
                })
            })
            .collect()
    }
}
