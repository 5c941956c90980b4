// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `item.vectorized` → `item.published` and `dataset.publish` →
//! `dataset.published`.
//!
//! Converts items into portal resources under the configured dataset and
//! creates datasets on demand. Publication of items is a deployment switch:
//! without a configured dataset id the stage acks item events with no side
//! effect.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use zguby_broker::{EventHandler, HandlerError};
use zguby_events::{
    DatasetPublish, DatasetPublished, Event, ItemPublished, ItemSubmitted, ItemVectorized,
};
use zguby_portal::{dcat, DatasetDraft, Portal, PortalError, ResourceDraft, ResourceFormat};

pub struct PortalPublisher {
    portal: Arc<dyn Portal>,
    dataset_id: Option<String>,
}

impl PortalPublisher {
    pub fn new(portal: Arc<dyn Portal>, dataset_id: Option<String>) -> Self {
        Self { portal, dataset_id }
    }

    /// Deterministic item → resource mapping, DCAT enrichment included.
    fn resource_draft(item: &ItemSubmitted) -> ResourceDraft {
        let has_photo = !item.image_url.trim().is_empty();
        ResourceDraft {
            title: item.title.clone(),
            description: item.description.clone(),
            link: item.image_url.clone(),
            format: if has_photo {
                ResourceFormat::Jpeg
            } else {
                ResourceFormat::Json
            },
            tags: dcat::default_tags(item.category),
            theme: dcat::theme_uri(item.category),
            spatial: dcat::spatial_label(&item.location),
        }
    }

    fn classify(err: PortalError) -> HandlerError {
        if err.is_transient() {
            HandlerError::transient(err)
        } else {
            HandlerError::permanent(err)
        }
    }

    async fn publish_item(&self, vectorized: ItemVectorized) -> Result<Vec<Event>, HandlerError> {
        let item_id = vectorized.item.item_id;
        let Some(dataset_id) = &self.dataset_id else {
            info!(%item_id, "no portal dataset configured, skipping publication");
            return Ok(vec![]);
        };
        let draft = Self::resource_draft(&vectorized.item);
        let published = self
            .portal
            .create_resource(dataset_id, &draft)
            .await
            .map_err(Self::classify)?;

        let now = Utc::now();
        debug!(%item_id, resource_id = %published.resource_id, "published portal resource");
        Ok(vec![Event::ItemPublished(ItemPublished {
            item_id,
            dataset_id: dataset_id.clone(),
            dane_gov_url: published.url,
            publication_date: now.date_naive(),
            published_at: now,
        })])
    }

    async fn publish_dataset(&self, request: DatasetPublish) -> Result<Vec<Event>, HandlerError> {
        let draft = DatasetDraft {
            title: request.title,
            notes: request.notes,
            url: request.url,
            institution_name: request.institution_name,
            email: request.email,
            categories: request.categories,
            tags: request.tags,
        };
        let created = self
            .portal
            .create_dataset(&draft)
            .await
            .map_err(Self::classify)?;

        let now = Utc::now();
        debug!(dataset_id = %request.dataset_id, dane_gov_id = %created.dataset_id, "published portal dataset");
        Ok(vec![Event::DatasetPublished(DatasetPublished {
            dataset_id: request.dataset_id,
            dane_gov_id: created.dataset_id,
            published_at: now,
            dane_gov_url: created.url,
            publication_date: now.date_naive(),
        })])
    }
}

#[async_trait]
impl EventHandler for PortalPublisher {
    fn name(&self) -> &str {
        "publisher"
    }

    async fn handle(&self, event: Event) -> Result<Vec<Event>, HandlerError> {
        match event {
            Event::ItemVectorized(vectorized) => self.publish_item(vectorized).await,
            Event::DatasetPublish(request) => self.publish_dataset(request).await,
            _ => Err(HandlerError::malformed(
                "publisher consumes item.vectorized and dataset.publish only",
            )),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
