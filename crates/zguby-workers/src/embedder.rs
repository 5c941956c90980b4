// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `item.submitted` → `item.embedded`.
//!
//! Attaches the joint text+image embedding. The image path is strictly
//! best-effort: any failure between blob fetch and vision encoding degrades
//! the message to text-only instead of failing it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};
use zguby_blob::{canonical_image_key, BlobStore, ImageRef};
use zguby_broker::{EventHandler, HandlerError};
use zguby_config::BlobConfig;
use zguby_embed::{joint, media, Encoder, EncoderError};
use zguby_events::{Event, ItemEmbedded};

pub struct Embedder {
    blob: Arc<dyn BlobStore>,
    encoder: Arc<dyn Encoder>,
    blob_cfg: BlobConfig,
}

impl Embedder {
    pub fn new(blob: Arc<dyn BlobStore>, encoder: Arc<dyn Encoder>, blob_cfg: BlobConfig) -> Self {
        Self {
            blob,
            encoder,
            blob_cfg,
        }
    }

    /// Fetch, validate, and encode the photo. Every failure returns `None`
    /// after logging: the message continues text-only.
    async fn image_vector(&self, item_id: uuid::Uuid, key: &str) -> Option<Vec<f32>> {
        let bytes = match self.blob.get(key).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%item_id, key, error = %err, "image fetch failed, embedding text-only");
                return None;
            }
        };
        if let Err(rejection) = media::probe_image(&bytes, self.blob_cfg.max_image_bytes) {
            warn!(%item_id, key, error = %rejection, "unusable image, embedding text-only");
            return None;
        }
        match self.encoder.encode_image(&bytes).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(%item_id, key, error = %err, "image encoding failed, embedding text-only");
                None
            }
        }
    }

    fn classify(err: EncoderError) -> HandlerError {
        if err.is_transient() {
            HandlerError::transient(err)
        } else {
            HandlerError::permanent(err)
        }
    }
}

#[async_trait]
impl EventHandler for Embedder {
    fn name(&self) -> &str {
        "embedder"
    }

    async fn handle(&self, event: Event) -> Result<Vec<Event>, HandlerError> {
        let Event::ItemSubmitted(mut item) = event else {
            return Err(HandlerError::malformed("embedder consumes item.submitted only"));
        };
        let item_id = item.item_id;

        // Canonicalize the image reference before anything else so the
        // image_url/image_key ambiguity stops here.
        let image_ref = canonical_image_key(&self.blob_cfg, &item.image_key, &item.image_url);
        if !item.has_text() && image_ref.key().is_none() {
            return Err(HandlerError::malformed(format!(
                "item {item_id} has neither text nor image"
            )));
        }
        if let ImageRef::LegacyUrl { url, key } = &image_ref {
            debug!(%item_id, url, key, source = image_ref.source(), "normalized legacy image reference");
        }
        if let Some(key) = image_ref.key() {
            item.image_key = key.to_string();
            if item.image_url.trim().is_empty() {
                item.image_url = self.blob.public_url(key);
            }
        }

        let text = joint::embedding_text(&item.title, &item.description, item.category.as_str());
        let text_vector = if text.is_empty() {
            None
        } else {
            Some(self.encoder.encode_text(&text).await.map_err(Self::classify)?)
        };

        let (image_vector, has_image_embedding) = match image_ref.key() {
            Some(key) => match self.image_vector(item_id, key).await {
                Some(vector) => (Some(vector), true),
                None => (None, false),
            },
            None => (None, false),
        };

        let embedding = match (text_vector, image_vector) {
            (Some(text), image) => joint::joint_embedding(text, image),
            (None, Some(image)) => image,
            // No text and the referenced image turned out unusable: nothing
            // left to embed.
            (None, None) => {
                return Err(HandlerError::permanent(format!(
                    "item {item_id} has no text and its image is unusable"
                )))
            }
        };

        item.timestamp = Some(Utc::now());
        debug!(%item_id, has_image_embedding, source = image_ref.source(), "embedded item");
        Ok(vec![Event::ItemEmbedded(ItemEmbedded {
            item,
            embedding,
            has_image_embedding,
        })])
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
