// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{keys, ItemSubmitted};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("unknown routing key: {0}")]
    UnknownRoutingKey(String),

    #[error("invalid {key} payload: {source}")]
    Json {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// `item.embedded`: everything from `item.submitted` plus the joint
/// text+image embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEmbedded {
    #[serde(flatten)]
    pub item: ItemSubmitted,
    /// Unit-norm joint embedding, length [`crate::EMBEDDING_DIM`].
    pub embedding: Vec<f32>,
    /// False when the pipeline degraded to text-only (missing photo, fetch
    /// failure, undecodable bytes, encoder timeout).
    pub has_image_embedding: bool,
}

/// `item.vectorized`: confirmation that the item has a point in the vector
/// collection. The embedding itself is omitted on the wire; the collection
/// owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemVectorized {
    #[serde(flatten)]
    pub item: ItemSubmitted,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub has_image_embedding: bool,
    /// Id of the point in the vector collection (equal to `item_id`).
    pub vector_id: Uuid,
}

/// `item.published`: the item now exists as a portal resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPublished {
    pub item_id: Uuid,
    pub dataset_id: String,
    pub dane_gov_url: String,
    pub publication_date: NaiveDate,
    pub published_at: DateTime<Utc>,
}

/// `dataset.publish`: request to create a dataset on the portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPublish {
    pub dataset_id: String,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub institution_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `dataset.published`: the portal accepted the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPublished {
    pub dataset_id: String,
    pub dane_gov_id: String,
    pub published_at: DateTime<Utc>,
    pub dane_gov_url: String,
    pub publication_date: NaiveDate,
}

/// `dataset.submitted`: a base64-encoded legacy file to explode into
/// individual `item.submitted` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSubmitted {
    pub dataset_id: String,
    /// Base64-encoded file contents.
    pub file_data: String,
    #[serde(default)]
    pub file_name: String,
    /// Lowercase extension-style format tag: "csv", "json", "txt", …
    pub file_format: String,
}

/// The tagged union of everything that travels over the exchange, one
/// variant per routing key.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ItemSubmitted(ItemSubmitted),
    ItemEmbedded(ItemEmbedded),
    ItemVectorized(ItemVectorized),
    ItemPublished(ItemPublished),
    DatasetPublish(DatasetPublish),
    DatasetPublished(DatasetPublished),
    DatasetSubmitted(DatasetSubmitted),
}

impl Event {
    /// The routing key this event is published under.
    pub fn routing_key(&self) -> &'static str {
        match self {
            Event::ItemSubmitted(_) => keys::ITEM_SUBMITTED,
            Event::ItemEmbedded(_) => keys::ITEM_EMBEDDED,
            Event::ItemVectorized(_) => keys::ITEM_VECTORIZED,
            Event::ItemPublished(_) => keys::ITEM_PUBLISHED,
            Event::DatasetPublish(_) => keys::DATASET_PUBLISH,
            Event::DatasetPublished(_) => keys::DATASET_PUBLISHED,
            Event::DatasetSubmitted(_) => keys::DATASET_SUBMITTED,
        }
    }

    /// The item identity carried by this event, when it has one. Used for
    /// structured logging only; correctness never depends on it.
    pub fn item_id(&self) -> Option<Uuid> {
        match self {
            Event::ItemSubmitted(p) => Some(p.item_id),
            Event::ItemEmbedded(p) => Some(p.item.item_id),
            Event::ItemVectorized(p) => Some(p.item.item_id),
            Event::ItemPublished(p) => Some(p.item_id),
            Event::DatasetPublish(_) | Event::DatasetPublished(_) | Event::DatasetSubmitted(_) => {
                None
            }
        }
    }

    /// Serialize the payload (the routing key travels separately, as AMQP
    /// metadata).
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        let (key, result) = match self {
            Event::ItemSubmitted(p) => (keys::ITEM_SUBMITTED, serde_json::to_vec(p)),
            Event::ItemEmbedded(p) => (keys::ITEM_EMBEDDED, serde_json::to_vec(p)),
            Event::ItemVectorized(p) => (keys::ITEM_VECTORIZED, serde_json::to_vec(p)),
            Event::ItemPublished(p) => (keys::ITEM_PUBLISHED, serde_json::to_vec(p)),
            Event::DatasetPublish(p) => (keys::DATASET_PUBLISH, serde_json::to_vec(p)),
            Event::DatasetPublished(p) => (keys::DATASET_PUBLISHED, serde_json::to_vec(p)),
            Event::DatasetSubmitted(p) => (keys::DATASET_SUBMITTED, serde_json::to_vec(p)),
        };
        result.map_err(|source| EventError::Json { key, source })
    }

    /// Decode a delivery body according to its routing key.
    pub fn decode(routing_key: &str, bytes: &[u8]) -> Result<Self, EventError> {
        match routing_key {
            keys::ITEM_SUBMITTED => serde_json::from_slice(bytes)
                .map(Event::ItemSubmitted)
                .map_err(|source| EventError::Json { key: keys::ITEM_SUBMITTED, source }),
            keys::ITEM_EMBEDDED => serde_json::from_slice(bytes)
                .map(Event::ItemEmbedded)
                .map_err(|source| EventError::Json { key: keys::ITEM_EMBEDDED, source }),
            keys::ITEM_VECTORIZED => serde_json::from_slice(bytes)
                .map(Event::ItemVectorized)
                .map_err(|source| EventError::Json { key: keys::ITEM_VECTORIZED, source }),
            keys::ITEM_PUBLISHED => serde_json::from_slice(bytes)
                .map(Event::ItemPublished)
                .map_err(|source| EventError::Json { key: keys::ITEM_PUBLISHED, source }),
            keys::DATASET_PUBLISH => serde_json::from_slice(bytes)
                .map(Event::DatasetPublish)
                .map_err(|source| EventError::Json { key: keys::DATASET_PUBLISH, source }),
            keys::DATASET_PUBLISHED => serde_json::from_slice(bytes)
                .map(Event::DatasetPublished)
                .map_err(|source| EventError::Json { key: keys::DATASET_PUBLISHED, source }),
            keys::DATASET_SUBMITTED => serde_json::from_slice(bytes)
                .map(Event::DatasetSubmitted)
                .map_err(|source| EventError::Json { key: keys::DATASET_SUBMITTED, source }),
            other => Err(EventError::UnknownRoutingKey(other.to_string())),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
