// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::order_results;
use crate::{
    check_dim, PointPayload, ScoredPoint, SearchFilter, SearchParams, VectorError, VectorPoint,
    VectorStore,
};

/// Exact-scan in-process vector store.
///
/// Implements the same ordering and filtering contract as the Qdrant driver
/// against a plain map, which makes it the reference implementation the
/// pipeline tests rank against.
#[derive(Default)]
pub struct MemoryStore {
    points: RwLock<HashMap<Uuid, (Vec<f32>, PointPayload)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }

    fn matches(filter: &SearchFilter, payload: &PointPayload) -> bool {
        if let Some(category) = &filter.category {
            if payload.category != *category {
                return false;
            }
        }
        if let Some(location) = &filter.location {
            let hay = payload.location.to_lowercase();
            if !hay.contains(&location.to_lowercase()) {
                return false;
            }
        }
        true
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na <= f32::EPSILON || nb <= f32::EPSILON {
            return 0.0;
        }
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self) -> Result<(), VectorError> {
        Ok(())
    }

    async fn upsert(&self, point: VectorPoint) -> Result<(), VectorError> {
        check_dim(&point.vector)?;
        self.points
            .write()
            .await
            .insert(point.id, (point.vector, point.payload));
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        params: &SearchParams,
    ) -> Result<Vec<ScoredPoint>, VectorError> {
        check_dim(vector)?;
        let points = self.points.read().await;
        let mut results: Vec<ScoredPoint> = points
            .iter()
            .filter(|(_, (_, payload))| Self::matches(&params.filter, payload))
            .map(|(id, (v, payload))| ScoredPoint {
                id: *id,
                score: Self::cosine(vector, v),
                payload: payload.clone(),
            })
            .filter(|hit| hit.score >= params.score_threshold)
            .collect();
        order_results(&mut results);
        results.truncate(params.limit);
        Ok(results)
    }

    async fn get(&self, id: Uuid) -> Result<Option<VectorPoint>, VectorError> {
        Ok(self.points.read().await.get(&id).map(|(vector, payload)| {
            VectorPoint {
                id,
                vector: vector.clone(),
                payload: payload.clone(),
            }
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<(), VectorError> {
        self.points.write().await.remove(&id);
        Ok(())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use zguby_events::EMBEDDING_DIM;

    fn payload(id: Uuid, category: &str, location: &str) -> PointPayload {
        PointPayload {
            item_id: id,
            title: format!("item {id}"),
            description: String::new(),
            category: category.into(),
            location: location.into(),
            image_url: String::new(),
            contact_info: String::new(),
        }
    }

    /// A unit vector leaning towards axis `axis` with a slight common
    /// component, so different points have distinct but comparable scores.
    fn vector(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[axis] = 1.0;
        v
    }

    fn point(idx: u128, axis: usize, category: &str, location: &str) -> VectorPoint {
        let id = Uuid::from_u128(idx);
        VectorPoint {
            id,
            vector: vector(axis),
            payload: payload(id, category, location),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_vector_and_payload_together() {
        let store = MemoryStore::new();
        let id = Uuid::from_u128(1);
        store.upsert(point(1, 0, "Klucze", "Centrum")).await.unwrap();
        store.upsert(point(1, 1, "Dokumenty", "Praga")).await.unwrap();
        assert_eq!(store.len().await, 1, "same id must not create a second point");

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.payload.category, "Dokumenty");
        assert!((stored.vector[1] - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn upsert_rejects_wrong_dimension() {
        let store = MemoryStore::new();
        let id = Uuid::from_u128(2);
        let bad = VectorPoint {
            id,
            vector: vec![0.0; 384],
            payload: payload(id, "Klucze", ""),
        };
        let err = store.upsert(bad).await.unwrap_err();
        assert!(matches!(err, VectorError::Dimension { got: 384, .. }));
        assert!(store.is_empty().await, "rejected vector must not be stored");
    }

    #[tokio::test]
    async fn search_returns_exact_match_first_with_unit_score() {
        let store = MemoryStore::new();
        for i in 0..10u128 {
            store
                .upsert(point(i, i as usize, "Inne", ""))
                .await
                .unwrap();
        }
        let query = vector(3);
        let hits = store
            .search(&query, &SearchParams { score_threshold: 0.0, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(hits[0].id, Uuid::from_u128(3));
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn search_omits_results_below_threshold() {
        let store = MemoryStore::new();
        store.upsert(point(1, 0, "Inne", "")).await.unwrap();
        store.upsert(point(2, 5, "Inne", "")).await.unwrap();
        // Orthogonal point scores 0.0 and must be cut by the 0.75 default.
        let hits = store
            .search(&vector(0), &SearchParams::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn category_filter_excludes_other_categories() {
        let store = MemoryStore::new();
        store.upsert(point(1, 0, "Klucze", "")).await.unwrap();
        store.upsert(point(2, 0, "Dokumenty", "")).await.unwrap();
        let params = SearchParams {
            score_threshold: 0.0,
            filter: SearchFilter { category: Some("Klucze".into()), location: None },
            ..Default::default()
        };
        let hits = store.search(&vector(0), &params).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.category, "Klucze");
    }

    #[tokio::test]
    async fn location_filter_is_keyword_containment() {
        let store = MemoryStore::new();
        store
            .upsert(point(1, 0, "Inne", "Dworzec Centralny, hala główna"))
            .await
            .unwrap();
        store.upsert(point(2, 0, "Inne", "Lotnisko")).await.unwrap();
        let params = SearchParams {
            score_threshold: 0.0,
            filter: SearchFilter { category: None, location: Some("centralny".into()) },
            ..Default::default()
        };
        let hits = store.search(&vector(0), &params).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn limit_truncates_ranked_results() {
        let store = MemoryStore::new();
        for i in 0..20u128 {
            store.upsert(point(i, 0, "Inne", "")).await.unwrap();
        }
        let params = SearchParams { limit: 5, score_threshold: 0.0, ..Default::default() };
        let hits = store.search(&vector(0), &params).await.unwrap();
        assert_eq!(hits.len(), 5);
        // All score 1.0; order must be id ascending (stable tie-break).
        let ids: Vec<u128> = hits.iter().map(|h| h.id.as_u128()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn delete_removes_the_point() {
        let store = MemoryStore::new();
        store.upsert(point(1, 0, "Inne", "")).await.unwrap();
        store.delete(Uuid::from_u128(1)).await.unwrap();
        assert!(store.get(Uuid::from_u128(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_rejects_wrong_dimension_query() {
        let store = MemoryStore::new();
        let err = store
            .search(&vec![0.0; 100], &SearchParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::Dimension { got: 100, .. }));
    }
}
