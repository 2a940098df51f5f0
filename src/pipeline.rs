//! Ingestion pipeline: raw document bytes in, stored searchable chunks out.
//!
//! Stages per document: received → extracted → chunked → embedding i/N →
//! stored. Chunks are processed strictly sequentially; each is embedded and
//! persisted before the next starts, so a failure on chunk k leaves chunks
//! 1..k-1 in place. Ingestion is not transactional across chunks; the
//! receipt and the error both carry how many chunks landed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunker::Chunker;
use crate::config::RagConfig;
use crate::embedding::Embedder;
use crate::errors::RagError;
use crate::extract::ExtractorRegistry;
use crate::store::{NewChunk, VectorStore};

/// One document to ingest.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    /// Pointer to the stored artifact, if the caller keeps one.
    pub file_url: Option<String>,
    pub owner_user_id: i64,
    pub workspace_id: i64,
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    /// Correlates the log lines emitted for this ingestion run.
    pub ingest_id: Uuid,
    /// Chunks successfully embedded and stored.
    pub chunks_processed: usize,
    pub file_url: Option<String>,
}

pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    extractors: ExtractorRegistry,
    chunker: Chunker,
    config: RagConfig,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: RagConfig,
    ) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self {
            embedder,
            store,
            extractors: ExtractorRegistry::with_defaults(),
            chunker: Chunker::from_config(&config)?,
            config,
        })
    }

    /// Replaces the extractor registry, e.g. to stub extraction in tests.
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReceipt, RagError> {
        let ingest_id = Uuid::new_v4();
        info!(
            %ingest_id,
            file = %request.file_name,
            mime = %request.mime_type,
            workspace = request.workspace_id,
            "ingestion received"
        );

        if !self.extractors.supports(&request.mime_type) {
            return Err(RagError::UnsupportedFileType(request.mime_type));
        }

        let text = self
            .extractors
            .extract(&request.bytes, &request.mime_type)
            .await?;
        if text.trim().is_empty() {
            return Err(RagError::EmptyExtraction(request.file_name));
        }
        debug!(chars = text.len(), "extracted");

        // Bound worst-case embedding cost before chunking.
        let text = truncate_chars(&text, self.config.max_source_chars);

        let chunks = self.chunker.split(&text)?;
        let total = chunks.len();
        debug!(chunks = total, "chunked");

        for (i, chunk_text) in chunks.into_iter().enumerate() {
            let chunk_index = i + 1;
            debug!(chunk = chunk_index, total, "embedding chunk");

            let embedding = self
                .embed_with_retry(&chunk_text)
                .await
                .map_err(|err| ingestion_failed(chunk_index, total, i, err))?;

            self.store
                .insert(NewChunk {
                    owner_user_id: request.owner_user_id,
                    workspace_id: request.workspace_id,
                    file_name: request.file_name.clone(),
                    file_url: request.file_url.clone(),
                    content: chunk_text,
                    embedding,
                })
                .await
                .map_err(|err| ingestion_failed(chunk_index, total, i, err))?;
        }

        info!(
            %ingest_id,
            file = %request.file_name,
            workspace = request.workspace_id,
            chunks = total,
            "ingestion stored"
        );

        Ok(IngestReceipt {
            ingest_id,
            chunks_processed: total,
            file_url: request.file_url,
        })
    }

    /// Bounded retry with exponential backoff for transient provider
    /// errors. Unauthenticated failures surface immediately.
    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut attempts = 0usize;
        loop {
            attempts += 1;
            match self.embedder.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) if err.is_retryable() && attempts <= self.config.max_embed_retries => {
                    let backoff = Duration::from_millis(200u64 << attempts.min(6));
                    warn!(attempt = attempts, error = %err, "embedding failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn ingestion_failed(
    chunk_index: usize,
    total_chunks: usize,
    chunks_stored: usize,
    source: RagError,
) -> RagError {
    RagError::IngestionFailed {
        chunk_index,
        total_chunks,
        chunks_stored,
        source: Box::new(source),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::embedding::HashingEmbedder;
    use crate::store::SqliteVectorStore;

    /// Embeds via an inner hashing embedder but fails permanently on the
    /// n-th distinct embed call.
    struct FailingEmbedder {
        inner: HashingEmbedder,
        fail_on_call: usize,
        calls: AtomicUsize,
    }

    impl FailingEmbedder {
        fn new(dimension: usize, fail_on_call: usize) -> Self {
            Self {
                inner: HashingEmbedder::new(dimension).unwrap(),
                fail_on_call,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on_call {
                // Fatal so the pipeline does not retry into a later call.
                return Err(RagError::ProviderUnavailable {
                    reason: "injected failure".to_string(),
                    unauthenticated: true,
                });
            }
            self.inner.embed(text).await
        }
    }

    /// Fails the first call with a transient error, then recovers.
    struct FlakyEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn name(&self) -> &str {
            "flaky"
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(RagError::RateLimited);
            }
            self.inner.embed(text).await
        }
    }

    async fn test_store() -> (Arc<SqliteVectorStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::with_path(dir.path().join("chunks.db"))
            .await
            .unwrap();
        (Arc::new(store), dir)
    }

    fn small_config() -> RagConfig {
        RagConfig {
            embedding_dimension: 32,
            chunk_size: 40,
            chunk_overlap: 8,
            ..Default::default()
        }
    }

    fn text_request(text: &str) -> IngestRequest {
        IngestRequest {
            bytes: text.as_bytes().to_vec(),
            mime_type: "text/plain".to_string(),
            file_name: "notes.txt".to_string(),
            file_url: None,
            owner_user_id: 7,
            workspace_id: 1,
        }
    }

    #[tokio::test]
    async fn ingests_text_document_into_chunks() {
        let (store, _dir) = test_store().await;
        let embedder = Arc::new(HashingEmbedder::new(32).unwrap());
        let pipeline =
            IngestionPipeline::new(embedder, store.clone(), small_config()).unwrap();

        let text = "Lecture notes on thermodynamics. ".repeat(10);
        let receipt = pipeline.ingest(text_request(&text)).await.unwrap();

        assert!(receipt.chunks_processed >= 2);
        assert_eq!(store.count(1).await.unwrap(), receipt.chunks_processed);
    }

    #[tokio::test]
    async fn rejects_unsupported_mime_type() {
        let (store, _dir) = test_store().await;
        let embedder = Arc::new(HashingEmbedder::new(32).unwrap());
        let pipeline = IngestionPipeline::new(embedder, store, small_config()).unwrap();

        let mut request = text_request("body");
        request.mime_type = "image/png".to_string();

        let err = pipeline.ingest(request).await.unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFileType(_)));
    }

    #[tokio::test]
    async fn rejects_empty_extraction() {
        let (store, _dir) = test_store().await;
        let embedder = Arc::new(HashingEmbedder::new(32).unwrap());
        let pipeline = IngestionPipeline::new(embedder, store, small_config()).unwrap();

        let err = pipeline.ingest(text_request("   \n ")).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyExtraction(_)));
    }

    #[tokio::test]
    async fn partial_failure_keeps_earlier_chunks_and_names_the_index() {
        let (store, _dir) = test_store().await;
        // Fail the second chunk's embedding.
        let embedder = Arc::new(FailingEmbedder::new(32, 2));
        let pipeline =
            IngestionPipeline::new(embedder.clone(), store.clone(), small_config()).unwrap();

        let text = "Alpha section one here. ".repeat(8);
        let err = pipeline.ingest(text_request(&text)).await.unwrap_err();

        match err {
            RagError::IngestionFailed {
                chunk_index,
                chunks_stored,
                total_chunks,
                ..
            } => {
                assert_eq!(chunk_index, 2);
                assert_eq!(chunks_stored, 1);
                assert!(total_chunks >= 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Chunk 1 persisted, chunk 3 never attempted.
        assert_eq!(store.count(1).await.unwrap(), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (store, _dir) = test_store().await;
        let embedder = Arc::new(FlakyEmbedder {
            inner: HashingEmbedder::new(32).unwrap(),
            calls: AtomicUsize::new(0),
        });
        let pipeline = IngestionPipeline::new(embedder, store.clone(), small_config()).unwrap();

        let receipt = pipeline.ingest(text_request("short document")).await.unwrap();
        assert_eq!(receipt.chunks_processed, 1);
        assert_eq!(store.count(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn source_text_is_truncated_before_chunking() {
        let (store, _dir) = test_store().await;
        let embedder = Arc::new(HashingEmbedder::new(32).unwrap());
        let config = RagConfig {
            max_source_chars: 50,
            ..small_config()
        };
        let pipeline = IngestionPipeline::new(embedder, store.clone(), config).unwrap();

        let text = "word ".repeat(1000);
        let receipt = pipeline.ingest(text_request(&text)).await.unwrap();

        // 50 chars at chunk_size 40 never needs more than 2 chunks.
        assert!(receipt.chunks_processed <= 2);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
