//! OpenAI-compatible HTTP embedding backend.
//!
//! Talks to any `/v1/embeddings` endpoint (OpenAI, LM Studio, llama.cpp
//! server). Authentication failures are surfaced as fatal; throttling and
//! connectivity problems as retryable.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::errors::RagError;
use crate::Embedder;

#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        dimension: usize,
    ) -> Result<Self, RagError> {
        if base_url.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "embedding base_url must not be empty".to_string(),
            ));
        }
        if dimension == 0 {
            return Err(RagError::InvalidInput(
                "embedding dimension must be positive".to_string(),
            ));
        }
        let endpoint = format!("{}/v1/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key,
            model,
            dimension,
        })
    }

    fn map_transport_error(err: reqwest::Error) -> RagError {
        if err.is_connect() || err.is_timeout() {
            RagError::ProviderUnavailable {
                reason: err.to_string(),
                unauthenticated: false,
            }
        } else {
            RagError::EmbeddingFailed(err.to_string())
        }
    }

    fn map_status_error(status: StatusCode, body: String) -> RagError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RagError::ProviderUnavailable {
                reason: format!("{status}: {body}"),
                unauthenticated: true,
            },
            StatusCode::TOO_MANY_REQUESTS => RagError::RateLimited,
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                RagError::ProviderUnavailable {
                    reason: format!("{status}: {body}"),
                    unauthenticated: false,
                }
            }
            _ => RagError::EmbeddingFailed(format!("{status}: {body}")),
        }
    }

    async fn request_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(Self::map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, body));
        }

        let mut payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::EmbeddingFailed(format!("malformed response: {e}")))?;

        payload.data.sort_by_key(|entry| entry.index);
        if payload.data.len() != inputs.len() {
            return Err(RagError::EmbeddingFailed(format!(
                "provider returned {} embeddings for {} inputs",
                payload.data.len(),
                inputs.len()
            )));
        }

        let mut vectors = Vec::with_capacity(payload.data.len());
        for entry in payload.data {
            if entry.embedding.len() != self.dimension {
                return Err(RagError::EmbeddingFailed(format!(
                    "provider returned {} dimensions, configured for {}",
                    entry.embedding.len(),
                    self.dimension
                )));
            }
            vectors.push(entry.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> &str {
        "http"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "cannot embed empty text".to_string(),
            ));
        }
        let input = [text.to_string()];
        let mut vectors = self.request_batch(&input).await?;
        vectors.pop().ok_or_else(|| {
            RagError::EmbeddingFailed("provider returned no embedding".to_string())
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(RagError::InvalidInput(
                "cannot embed empty text".to_string(),
            ));
        }
        self.request_batch(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_fatal_provider_error() {
        let err = HttpEmbedder::map_status_error(StatusCode::UNAUTHORIZED, "nope".into());
        assert!(matches!(
            err,
            RagError::ProviderUnavailable {
                unauthenticated: true,
                ..
            }
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn throttling_maps_to_rate_limited() {
        let err = HttpEmbedder::map_status_error(StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(err, RagError::RateLimited));
        assert!(err.is_retryable());
    }

    #[test]
    fn server_errors_map_to_embedding_failed() {
        let err =
            HttpEmbedder::map_status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".into());
        assert!(matches!(err, RagError::EmbeddingFailed(_)));
    }

    #[test]
    fn gateway_errors_are_retryable_unavailability() {
        let err = HttpEmbedder::map_status_error(StatusCode::BAD_GATEWAY, String::new());
        assert!(matches!(
            err,
            RagError::ProviderUnavailable {
                unauthenticated: false,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(HttpEmbedder::new(String::new(), None, "m".into(), 384).is_err());
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let embedder =
            HttpEmbedder::new("http://localhost:1234/".into(), None, "m".into(), 384).unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:1234/v1/embeddings");
    }
}
