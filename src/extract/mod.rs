//! Document text extraction.
//!
//! External-collaborator seam for turning raw uploaded bytes into plain
//! text. Plain text and PDF are the supported types; anything else is
//! rejected before extraction is attempted.

mod pdf;
mod text;

pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::RagError;

pub const MIME_PLAIN_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";

/// Extracts plain text from raw document bytes.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// MIME types this extractor handles.
    fn supported_types(&self) -> &[&str];

    async fn extract(&self, bytes: &[u8]) -> Result<String, RagError>;
}

/// MIME-keyed registry of extractors.
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn DocumentExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Registry with the built-in plain-text and PDF extractors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PlainTextExtractor);
        registry.register(PdfExtractor);
        registry
    }

    pub fn register<E: DocumentExtractor + 'static>(&mut self, extractor: E) {
        let extractor = Arc::new(extractor);
        for mime in extractor.supported_types() {
            self.extractors.insert((*mime).to_string(), extractor.clone());
        }
    }

    pub fn supports(&self, mime_type: &str) -> bool {
        self.extractors.contains_key(mime_type)
    }

    /// Extracts text for the given MIME type, rejecting unsupported types
    /// before any extraction work happens.
    pub async fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<String, RagError> {
        let extractor = self
            .extractors
            .get(mime_type)
            .ok_or_else(|| RagError::UnsupportedFileType(mime_type.to_string()))?;
        extractor.extract(bytes).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_dispatches_by_mime() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(registry.supports(MIME_PLAIN_TEXT));
        assert!(registry.supports(MIME_PDF));
        assert!(!registry.supports("image/png"));

        let text = registry
            .extract(b"hello there", MIME_PLAIN_TEXT)
            .await
            .unwrap();
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn unknown_mime_is_rejected_before_extraction() {
        let registry = ExtractorRegistry::with_defaults();
        let err = registry
            .extract(b"GIF89a", "image/gif")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFileType(_)));
    }
}
