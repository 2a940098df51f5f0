use async_trait::async_trait;

use super::{DocumentExtractor, MIME_PLAIN_TEXT};
use crate::errors::RagError;

/// UTF-8 plain text extractor.
pub struct PlainTextExtractor;

#[async_trait]
impl DocumentExtractor for PlainTextExtractor {
    fn supported_types(&self) -> &[&str] {
        &[MIME_PLAIN_TEXT]
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String, RagError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| RagError::ExtractionFailed(format!("invalid UTF-8: {e}")))?;
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_utf8() {
        let text = PlainTextExtractor.extract("héllo".as_bytes()).await.unwrap();
        assert_eq!(text, "héllo");
    }

    #[tokio::test]
    async fn rejects_invalid_utf8() {
        let err = PlainTextExtractor.extract(&[0xff, 0xfe]).await.unwrap_err();
        assert!(matches!(err, RagError::ExtractionFailed(_)));
    }
}
