use thiserror::Error;

/// Error taxonomy for the RAG core.
///
/// Callers decide retry vs. abort from the variant: transient provider
/// errors are retryable with backoff, everything caller-facing is not.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("no text could be extracted from {0}")]
    EmptyExtraction(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("embedding provider unavailable: {reason}")]
    ProviderUnavailable {
        reason: String,
        /// Missing or rejected credential. No amount of retry fixes this.
        unauthenticated: bool,
    },

    #[error("embedding provider rate limited")]
    RateLimited,

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error(
        "embedding dimension mismatch for workspace {workspace_id}: expected {expected}, got {actual}"
    )]
    DimensionMismatch {
        workspace_id: i64,
        expected: usize,
        actual: usize,
    },

    #[error(
        "ingestion failed at chunk {chunk_index} of {total_chunks} ({chunks_stored} stored): {source}"
    )]
    IngestionFailed {
        /// 1-based index of the chunk that failed.
        chunk_index: usize,
        total_chunks: usize,
        /// Chunks already persisted before the failure. Not rolled back.
        chunks_stored: usize,
        #[source]
        source: Box<RagError>,
    },

    #[error("no documents available for workspace {0}")]
    NoContext(i64),

    #[error("storage error: {0}")]
    Storage(String),
}

impl RagError {
    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }

    /// Whether a caller may retry the failed operation with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::ProviderUnavailable {
                unauthenticated, ..
            } => !unauthenticated,
            RagError::RateLimited | RagError::EmbeddingFailed(_) => true,
            _ => false,
        }
    }
}
