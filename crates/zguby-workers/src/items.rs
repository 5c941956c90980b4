// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Handle to the intake gateway's metadata store.
//!
//! The real store is external; the pipeline only needs the per-item
//! processing flags with monotone update semantics, which is exactly the
//! [`ItemStore`] surface. Flags only ever go false→true, so the two writers
//! (intake gateway, status reconciler) cannot race destructively.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;
use zguby_events::ItemSubmitted;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
}

/// Coarse item lifecycle as surfaced to gateway users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
    #[default]
    Pending,
    PublishedInPipeline,
}

/// A stored item with its processing flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item: ItemSubmitted,
    pub status: ItemStatus,
    pub embedded: bool,
    pub vectorized: bool,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemRecord {
    pub fn new(item: ItemSubmitted) -> Self {
        let now = Utc::now();
        Self {
            item,
            status: ItemStatus::Pending,
            embedded: false,
            vectorized: false,
            published: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The flag surface of the metadata store. All `mark_*` operations are
/// idempotent and return whether the item exists; flags never revert.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<ItemRecord>, StoreError>;

    /// Upsert of the item body, used by the intake side. Re-submission with
    /// the same id replaces the fields but keeps the flags.
    async fn insert(&self, item: ItemSubmitted) -> Result<(), StoreError>;

    async fn mark_embedded(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Also transitions a `pending` item to `published-in-pipeline`.
    async fn mark_vectorized(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Setting `published` implies `vectorized` and `embedded`; the flag
    /// sequence stays a prefix of ∅ → embedded → vectorized → published.
    async fn mark_published(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// In-process store used by tests and single-node deployments.
#[derive(Default)]
pub struct MemoryItemStore {
    records: RwLock<HashMap<Uuid, ItemRecord>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    async fn update(&self, id: Uuid, apply: impl FnOnce(&mut ItemRecord)) -> bool {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) => {
                apply(record);
                record.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn get(&self, id: Uuid) -> Result<Option<ItemRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn insert(&self, item: ItemSubmitted) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&item.item_id) {
            Some(record) => {
                record.item = item;
                record.updated_at = Utc::now();
            }
            None => {
                records.insert(item.item_id, ItemRecord::new(item));
            }
        }
        Ok(())
    }

    async fn mark_embedded(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.update(id, |r| r.embedded = true).await)
    }

    async fn mark_vectorized(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .update(id, |r| {
                r.vectorized = true;
                if r.status == ItemStatus::Pending {
                    r.status = ItemStatus::PublishedInPipeline;
                }
            })
            .await)
    }

    async fn mark_published(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .update(id, |r| {
                r.embedded = true;
                r.vectorized = true;
                r.published = true;
            })
            .await)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
