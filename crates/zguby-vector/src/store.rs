// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zguby_events::{ItemSubmitted, EMBEDDING_DIM};

use crate::VectorError;

/// HNSW graph degree for collection creation.
pub const HNSW_M: u64 = 32;
/// HNSW construction beam width.
pub const HNSW_EF_CONSTRUCT: u64 = 200;
/// Search-time beam width when the caller does not override it.
pub const DEFAULT_HNSW_EF: u64 = 128;
/// Results scoring below this cosine similarity are omitted.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.75;

/// Payload attached to every point: the subset of item fields used for
/// filtering and for hydrating search results without a metadata-store
/// round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub item_id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub contact_info: String,
}

impl PointPayload {
    /// Project an incoming item onto the payload subset.
    pub fn from_item(item: &ItemSubmitted) -> Self {
        Self {
            item_id: item.item_id,
            title: item.title.clone(),
            description: item.description.clone(),
            category: item.category.to_string(),
            location: item.location.clone(),
            image_url: item.image_url.clone(),
            contact_info: item.contact_info(),
        }
    }
}

/// A (vector, payload) record stored under a stable id.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: Uuid,
    pub score: f32,
    pub payload: PointPayload,
}

/// Keyword filter over payload fields. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Exact category label match.
    pub category: Option<String>,
    /// Keyword match against the free-text location.
    pub location: Option<String>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.location.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub limit: usize,
    pub score_threshold: f32,
    pub filter: SearchFilter,
    pub hnsw_ef: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: 10,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            filter: SearchFilter::default(),
            hnsw_ef: DEFAULT_HNSW_EF,
        }
    }
}

/// Boundary assertion: every vector entering the store (upsert or query)
/// must match the collection dimension.
pub fn check_dim(vector: &[f32]) -> Result<(), VectorError> {
    if vector.len() != EMBEDDING_DIM {
        return Err(VectorError::Dimension {
            got: vector.len(),
            want: EMBEDDING_DIM,
        });
    }
    Ok(())
}

/// The abstract vector collection.
///
/// Ordering contract for [`search`](VectorStore::search): descending score,
/// ties broken by point id ascending, results below the threshold omitted.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist. Idempotent; declared by
    /// every consumer of the store on startup.
    async fn ensure_collection(&self) -> Result<(), VectorError>;

    /// Insert-or-replace the point under its id; vector and payload are
    /// replaced together.
    async fn upsert(&self, point: VectorPoint) -> Result<(), VectorError>;

    async fn search(
        &self,
        vector: &[f32],
        params: &SearchParams,
    ) -> Result<Vec<ScoredPoint>, VectorError>;

    async fn get(&self, id: Uuid) -> Result<Option<VectorPoint>, VectorError>;

    async fn delete(&self, id: Uuid) -> Result<(), VectorError>;
}

/// Apply the contractual result ordering in place: score descending, point
/// id ascending on ties. Shared by both implementations so rankings agree
/// between tests and production.
pub(crate) fn order_results(results: &mut [ScoredPoint]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
