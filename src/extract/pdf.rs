//! PDF text extraction via `pdf-extract`, run on the blocking pool.

use async_trait::async_trait;
use tracing::debug;

use super::{DocumentExtractor, MIME_PDF};
use crate::errors::RagError;

pub struct PdfExtractor;

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    fn supported_types(&self) -> &[&str] {
        &[MIME_PDF]
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String, RagError> {
        debug!(size = bytes.len(), "extracting pdf text");
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| RagError::ExtractionFailed(format!("pdf extraction failed: {e}")))
        })
        .await
        .map_err(|e| RagError::ExtractionFailed(format!("extraction task failed: {e}")))?
    }
}
