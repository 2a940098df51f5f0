//! studyrag: workspace-scoped retrieval-augmented generation core.
//!
//! Turns uploaded documents into stored, searchable chunks and answers
//! similarity queries over them:
//!
//! - [`chunker`]: deterministic overlapping text splitting
//! - [`embedding`]: provider-agnostic vector production
//! - [`store`]: chunk persistence and workspace-scoped cosine search
//! - [`pipeline`]: ingestion orchestration (extract → chunk → embed → store)
//! - [`retrieval`]: query embedding, search, and context assembly
//!
//! The surrounding application (auth, workspace CRUD, answer generation)
//! calls in with a user id, a workspace id, and either a document or a
//! query, and gets back an ingestion receipt or a context bundle.

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod extract;
pub mod logging;
pub mod pipeline;
pub mod retrieval;
pub mod store;
pub mod vector_math;

pub use chunker::{chunk, Chunker};
pub use config::{EmbeddingProviderKind, RagConfig};
pub use embedding::Embedder;
pub use errors::RagError;
pub use pipeline::{IngestReceipt, IngestRequest, IngestionPipeline};
pub use retrieval::{ContextBundle, ContextChunk, RetrievalService};
pub use store::{ChunkId, NewChunk, SearchHit, StoredChunk, VectorStore};
