// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The status reconciler embedded in the intake gateway.
//!
//! Observes `item.embedded` and `item.vectorized` on the private status
//! queue and mirrors them into the per-item processing flags. No outbound
//! events; unknown items (pruned since submission) are acked silently.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;
use zguby_broker::{EventHandler, HandlerError};
use zguby_events::Event;

use crate::{ItemStore, StoreError};

pub struct StatusReconciler {
    items: Arc<dyn ItemStore>,
}

impl StatusReconciler {
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }

    fn classify(err: StoreError) -> HandlerError {
        // The metadata store being down is always worth a retry.
        HandlerError::transient(err)
    }

    fn note_unknown(item_id: Uuid, key: &str) {
        debug!(%item_id, key, "status event for unknown item, ignoring");
    }
}

#[async_trait]
impl EventHandler for StatusReconciler {
    fn name(&self) -> &str {
        "status-reconciler"
    }

    async fn handle(&self, event: Event) -> Result<Vec<Event>, HandlerError> {
        match &event {
            Event::ItemEmbedded(embedded) => {
                let item_id = embedded.item.item_id;
                let known = self
                    .items
                    .mark_embedded(item_id)
                    .await
                    .map_err(Self::classify)?;
                if !known {
                    Self::note_unknown(item_id, event.routing_key());
                }
            }
            Event::ItemVectorized(vectorized) => {
                let item_id = vectorized.item.item_id;
                let known = self
                    .items
                    .mark_vectorized(item_id)
                    .await
                    .map_err(Self::classify)?;
                if !known {
                    Self::note_unknown(item_id, event.routing_key());
                }
            }
            _ => {
                return Err(HandlerError::malformed(
                    "reconciler consumes item.embedded and item.vectorized only",
                ))
            }
        }
        Ok(vec![])
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
