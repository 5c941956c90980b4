// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `item.embedded` → `item.vectorized`.
//!
//! Validates the embedding length, upserts the point (vector + payload,
//! replaced atomically under `point_id = item_id`), and confirms with an
//! `item.vectorized` event. The embedding is dropped from the outgoing
//! payload; the collection owns it from here on.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use zguby_broker::{EventHandler, HandlerError};
use zguby_events::{Event, ItemVectorized, EMBEDDING_DIM};
use zguby_vector::{PointPayload, VectorError, VectorPoint, VectorStore};

pub struct Indexer {
    store: Arc<dyn VectorStore>,
}

impl Indexer {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    fn classify(err: VectorError) -> HandlerError {
        match err {
            VectorError::Dimension { got, want } => {
                HandlerError::malformed(format!("embedding has {got} dimensions, expected {want}"))
            }
            err if err.is_transient() => HandlerError::transient(err),
            err => HandlerError::permanent(err),
        }
    }
}

#[async_trait]
impl EventHandler for Indexer {
    fn name(&self) -> &str {
        "indexer"
    }

    async fn handle(&self, event: Event) -> Result<Vec<Event>, HandlerError> {
        let Event::ItemEmbedded(embedded) = event else {
            return Err(HandlerError::malformed("indexer consumes item.embedded only"));
        };
        let item_id = embedded.item.item_id;

        if embedded.embedding.len() != EMBEDDING_DIM {
            return Err(HandlerError::malformed(format!(
                "item {item_id} embedding has {} dimensions, expected {EMBEDDING_DIM}",
                embedded.embedding.len()
            )));
        }

        let point = VectorPoint {
            id: item_id,
            vector: embedded.embedding,
            payload: PointPayload::from_item(&embedded.item),
        };
        self.store.upsert(point).await.map_err(Self::classify)?;
        debug!(%item_id, "indexed item");

        Ok(vec![Event::ItemVectorized(ItemVectorized {
            item: embedded.item,
            embedding: None,
            has_image_embedding: embedded.has_image_embedding,
            vector_id: item_id,
        })])
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
