//! Optional semantic-similarity capability.
//!
//! When no provider is configured the pipeline installs `NullEmbedding` and
//! the semantic term of the blend contributes 0. Provider failures degrade
//! the same way: `embed` answers None, never an error.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Produces a fixed-length vector for a text, or None when unavailable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

/// Null-object provider: semantic similarity disabled.
pub struct NullEmbedding;

#[async_trait]
impl EmbeddingProvider for NullEmbedding {
    async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

/// Embedding provider speaking the common `/embeddings` wire shape:
/// `{"model": ..., "input": [text]}` → `{"data": [{"embedding": [...]}]}`.
pub struct HttpEmbeddingProvider {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddingProvider {
    pub fn new(url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("embedding request failed: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("embedding request returned {}", response.status());
            return None;
        }

        match response.json::<EmbeddingsResponse>().await {
            Ok(parsed) => parsed.data.into_iter().next().map(|row| row.embedding),
            Err(e) => {
                warn!("embedding response parse failed: {e}");
                None
            }
        }
    }
}

/// Normalized dot product. Zero for mismatched lengths or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Maps cosine similarity onto the 0..=100 scoring scale. Negative
/// similarity floors at 0.
pub fn similarity_score(a: &[f32], b: &[f32]) -> u8 {
    (cosine_similarity(a, b).clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.5, 0.5, 0.7];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_norm_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_similarity_score_bounds() {
        assert_eq!(similarity_score(&[1.0, 0.0], &[1.0, 0.0]), 100);
        assert_eq!(similarity_score(&[1.0, 0.0], &[-1.0, 0.0]), 0);
    }

    #[tokio::test]
    async fn test_null_embedding_returns_none() {
        assert!(NullEmbedding.embed("any text").await.is_none());
    }
}
