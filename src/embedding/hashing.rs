//! Local feature-hashing embedder.
//!
//! Offline and deterministic: the same text under the same configuration
//! always yields the same vector. Tokens are hashed into signed buckets and
//! the result is L2-normalized, so cosine similarity tracks token overlap.
//! Useful as a credential-free default and for tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::errors::RagError;
use crate::Embedder;

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, RagError> {
        if dimension == 0 {
            return Err(RagError::InvalidInput(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn embed_sync(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "cannot embed empty text".to_string(),
            ));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest[0..8]);
            let bucket = u64::from_le_bytes(prefix);
            let index = (bucket % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm <= f32::EPSILON {
            // All buckets cancelled out. Keep the vector valid.
            vector[0] = 1.0;
        } else {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Ok(vector)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.embed_sync(text)
    }
}
