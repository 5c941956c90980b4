// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;
use zguby_config::VectorConfig;
use zguby_events::EMBEDDING_DIM;

use async_trait::async_trait;

use crate::store::order_results;
use crate::{
    check_dim, PointPayload, ScoredPoint, SearchParams, VectorError, VectorPoint, VectorStore,
    DEFAULT_HNSW_EF, HNSW_EF_CONSTRUCT, HNSW_M,
};

/// Qdrant driver over the REST API.
///
/// Kept REST rather than gRPC so the whole pipeline shares one HTTP stack;
/// the endpoints used are stable since Qdrant 1.x.
pub struct QdrantStore {
    http: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    result: Option<T>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: Value,
    score: f32,
    payload: Option<PointPayload>,
}

#[derive(Deserialize)]
struct StoredPoint {
    payload: Option<PointPayload>,
    vector: Option<Vec<f32>>,
}

impl QdrantStore {
    pub fn new(cfg: &VectorConfig) -> Result<Self, VectorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| VectorError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            collection: cfg.collection.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }
        req
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<Option<T>, VectorError> {
        let resp = req
            .send()
            .await
            .map_err(|e| VectorError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VectorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| VectorError::Response(e.to_string()))?;
        Ok(parsed.result)
    }

    fn parse_id(value: &Value) -> Result<Uuid, VectorError> {
        value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| VectorError::Response(format!("non-UUID point id: {value}")))
    }

    fn filter_clause(params: &SearchParams) -> Option<Value> {
        if params.filter.is_empty() {
            return None;
        }
        let mut must = Vec::new();
        if let Some(category) = &params.filter.category {
            must.push(json!({ "key": "category", "match": { "value": category } }));
        }
        if let Some(location) = &params.filter.location {
            must.push(json!({ "key": "location", "match": { "text": location } }));
        }
        Some(json!({ "must": must }))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self) -> Result<(), VectorError> {
        let path = format!("/collections/{}", self.collection);
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| VectorError::Unavailable(e.to_string()))?;
        if resp.status().is_success() {
            debug!(collection = %self.collection, "collection already present");
            return Ok(());
        }
        if resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(VectorError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let body = json!({
            "vectors": { "size": EMBEDDING_DIM, "distance": "Cosine" },
            "hnsw_config": { "m": HNSW_M, "ef_construct": HNSW_EF_CONSTRUCT },
            "on_disk_payload": true,
        });
        let resp = self
            .request(reqwest::Method::PUT, &path)
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorError::Unavailable(e.to_string()))?;
        // 409: another worker won the race; the collection exists.
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::CONFLICT {
            return Err(VectorError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        info!(collection = %self.collection, dim = EMBEDDING_DIM, "created vector collection");

        // Payload indexes backing the keyword filters. Idempotent: Qdrant
        // answers 409 for an index that already exists.
        for (field, schema) in [("category", "keyword"), ("location", "text")] {
            let resp = self
                .request(
                    reqwest::Method::PUT,
                    &format!("/collections/{}/index", self.collection),
                )
                .json(&json!({ "field_name": field, "field_schema": schema }))
                .send()
                .await
                .map_err(|e| VectorError::Unavailable(e.to_string()))?;
            if !resp.status().is_success() && resp.status() != reqwest::StatusCode::CONFLICT {
                return Err(VectorError::Status {
                    status: resp.status().as_u16(),
                    body: resp.text().await.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    async fn upsert(&self, point: VectorPoint) -> Result<(), VectorError> {
        check_dim(&point.vector)?;
        let body = json!({
            "points": [{
                "id": point.id.to_string(),
                "vector": point.vector,
                "payload": point.payload,
            }]
        });
        let req = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{}/points?wait=true", self.collection),
            )
            .json(&body);
        let _: Option<Value> = self.execute(req).await?;
        debug!(point_id = %point.id, "upserted point");
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        params: &SearchParams,
    ) -> Result<Vec<ScoredPoint>, VectorError> {
        check_dim(vector)?;
        let hnsw_ef = if params.hnsw_ef > 0 {
            params.hnsw_ef
        } else {
            DEFAULT_HNSW_EF
        };
        let mut body = json!({
            "vector": vector,
            "limit": params.limit,
            "score_threshold": params.score_threshold,
            "with_payload": true,
            "params": { "hnsw_ef": hnsw_ef },
        });
        if let Some(filter) = Self::filter_clause(params) {
            body["filter"] = filter;
        }
        let req = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/points/search", self.collection),
            )
            .json(&body);
        let hits: Vec<SearchHit> = self.execute(req).await?.unwrap_or_default();

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            results.push(ScoredPoint {
                id: Self::parse_id(&hit.id)?,
                score: hit.score,
                payload: hit
                    .payload
                    .ok_or_else(|| VectorError::Response("hit without payload".into()))?,
            });
        }
        // The store already ranks by score; re-apply the full contract so
        // ties are broken identically to the in-memory implementation.
        order_results(&mut results);
        Ok(results)
    }

    async fn get(&self, id: Uuid) -> Result<Option<VectorPoint>, VectorError> {
        let path = format!("/collections/{}/points/{id}", self.collection);
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| VectorError::Unavailable(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(VectorError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let parsed: ApiResponse<StoredPoint> = resp
            .json()
            .await
            .map_err(|e| VectorError::Response(e.to_string()))?;
        Ok(parsed.result.map(|p| VectorPoint {
            id,
            vector: p.vector.unwrap_or_default(),
            payload: p.payload.unwrap_or_else(|| PointPayload {
                item_id: id,
                title: String::new(),
                description: String::new(),
                category: String::new(),
                location: String::new(),
                image_url: String::new(),
                contact_info: String::new(),
            }),
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<(), VectorError> {
        let req = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/points/delete?wait=true", self.collection),
            )
            .json(&json!({ "points": [id.to_string()] }));
        let _: Option<Value> = self.execute(req).await?;
        Ok(())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
