// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest as _, Sha256};
use tracing::debug;
use zguby_config::EncoderConfig;
use zguby_events::EMBEDDING_DIM;

use crate::EncoderError;

/// The multi-modal encoder seam. Both methods return unit-norm vectors of
/// [`EMBEDDING_DIM`] length.
#[async_trait]
pub trait Encoder: Send + Sync {
    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }

    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, EncoderError>;

    async fn encode_image(&self, bytes: &[u8]) -> Result<Vec<f32>, EncoderError>;
}

// ─── HTTP driver ─────────────────────────────────────────────────────────────

/// Driver for the remote encoder sidecar.
///
/// Wire format: `POST {url}/embeddings/text` with `{"text": …}` and
/// `POST {url}/embeddings/image` with `{"image": "<base64>"}`; both answer
/// `{"embedding": [f32; 512]}`.
pub struct HttpEncoder {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl HttpEncoder {
    pub fn new(cfg: &EncoderConfig) -> Result<Self, EncoderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| EncoderError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }

    async fn post_embed(&self, path: &str, body: serde_json::Value) -> Result<Vec<f32>, EncoderError> {
        let mut req = self.http.post(format!("{}{path}", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| EncoderError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EncoderError::Status(status.as_u16()));
        }
        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| EncoderError::Response(e.to_string()))?;
        if parsed.embedding.len() != EMBEDDING_DIM {
            return Err(EncoderError::Dimension {
                got: parsed.embedding.len(),
                want: EMBEDDING_DIM,
            });
        }
        debug!(path, "encoded");
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl Encoder for HttpEncoder {
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
        self.post_embed("/embeddings/text", json!({ "text": text })).await
    }

    async fn encode_image(&self, bytes: &[u8]) -> Result<Vec<f32>, EncoderError> {
        self.post_embed("/embeddings/image", json!({ "image": B64.encode(bytes) }))
            .await
    }
}

// ─── Deterministic mock ──────────────────────────────────────────────────────

/// Deterministic encoder for tests and local pipelines without the encoder
/// sidecar. Identical input always yields the identical unit vector, and
/// distinct inputs land nearly orthogonal in 512 dimensions, which is all
/// the ranking tests need.
#[derive(Default, Clone)]
pub struct MockEncoder;

impl MockEncoder {
    fn derive(domain: &str, payload: &[u8]) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update(payload);
        let digest = hasher.finalize();
        let mut state = u64::from_le_bytes(digest[..8].try_into().unwrap()) | 1;

        let mut v = Vec::with_capacity(EMBEDDING_DIM);
        for _ in 0..EMBEDDING_DIM {
            // xorshift64*, seeded from the content hash.
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            let sample = state.wrapping_mul(0x2545F4914F6CDD1D);
            // Map the top 24 bits into [-1, 1).
            let unit = ((sample >> 40) as f32) / ((1u64 << 23) as f32) - 1.0;
            v.push(unit);
        }
        crate::joint::l2_normalize(v)
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
        Ok(Self::derive("text", text.as_bytes()))
    }

    async fn encode_image(&self, bytes: &[u8]) -> Result<Vec<f32>, EncoderError> {
        Ok(Self::derive("image", bytes))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::{cosine, l2_norm};

    #[tokio::test]
    async fn mock_text_vectors_are_deterministic_unit_norm() {
        let enc = MockEncoder;
        let a = enc.encode_text("czarny portfel").await.unwrap();
        let b = enc.encode_text("czarny portfel").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), EMBEDDING_DIM);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn mock_distinct_texts_diverge() {
        let enc = MockEncoder;
        let a = enc.encode_text("czarny portfel").await.unwrap();
        let b = enc.encode_text("pęk kluczy").await.unwrap();
        assert!(
            cosine(&a, &b) < 0.5,
            "distinct inputs should land far apart"
        );
    }

    #[tokio::test]
    async fn mock_image_and_text_domains_are_separated() {
        let enc = MockEncoder;
        let t = enc.encode_text("abc").await.unwrap();
        let i = enc.encode_image(b"abc").await.unwrap();
        assert_ne!(t, i, "same bytes in different modality must not collide");
    }

    #[test]
    fn http_encoder_builds_from_default_config() {
        let cfg = EncoderConfig::default();
        let enc = HttpEncoder::new(&cfg).unwrap();
        assert_eq!(enc.base_url, "http://localhost:8090");
        assert_eq!(enc.dim(), EMBEDDING_DIM);
    }
}
