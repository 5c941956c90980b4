// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Client for the photo blob store.
//!
//! The store is treated as a content-addressed HTTP surface: objects live at
//! `{endpoint}/{bucket}/{key}` and that URL doubles as the stable public
//! link published to the portal. [`BlobStore`] is the seam the embedder and
//! the intake side program against; [`HttpBlobStore`] is the real driver and
//! [`MemoryBlobStore`] backs tests.
//!
//! This crate also owns image-reference canonicalization: legacy producers
//! send `image_url` without `image_key`, and [`canonical_image_key`] folds
//! that ambiguity back into a single key at the embedder's ingress so it
//! never propagates further.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;
use zguby_config::BlobConfig;

pub use error::BlobError;

mod error;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Store `bytes` under `key` and return the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, BlobError>;

    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, BlobError>;

    /// The stable public URL for `key`. Derivable without a round-trip.
    fn public_url(&self, key: &str) -> String;
}

/// Which form the producer used to reference the photo. Logged by the
/// embedder for operability; the pipeline itself only ever sees the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Canonical `image_key` was present.
    Key(String),
    /// Only a legacy `image_url` was present; `key` is the canonical form
    /// recovered from it.
    LegacyUrl { url: String, key: String },
    /// No photo referenced.
    None,
}

impl ImageRef {
    pub fn key(&self) -> Option<&str> {
        match self {
            ImageRef::Key(k) => Some(k),
            ImageRef::LegacyUrl { key, .. } => Some(key),
            ImageRef::None => None,
        }
    }

    /// Short tag for log fields.
    pub fn source(&self) -> &'static str {
        match self {
            ImageRef::Key(_) => "image_key",
            ImageRef::LegacyUrl { .. } => "image_url",
            ImageRef::None => "none",
        }
    }
}

/// Canonicalize the `image_key` / `image_url` pair of an incoming report.
///
/// Preference order: an explicit key wins; otherwise the key is recovered
/// from the URL by stripping the store's `{endpoint}/{bucket}/` prefix; a
/// URL pointing outside our store gets a deterministic UUIDv5-derived key so
/// repeated submissions of the same URL canonicalize identically.
pub fn canonical_image_key(cfg: &BlobConfig, image_key: &str, image_url: &str) -> ImageRef {
    let key = image_key.trim();
    if !key.is_empty() {
        return ImageRef::Key(key.to_string());
    }
    let url = image_url.trim();
    if url.is_empty() {
        return ImageRef::None;
    }
    let prefix = format!("{}/{}/", cfg.endpoint.trim_end_matches('/'), cfg.bucket);
    let key = match url.strip_prefix(&prefix) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => {
            // Foreign URL: derive a stable key in a reserved prefix.
            let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes());
            format!("legacy/{id}")
        }
    };
    ImageRef::LegacyUrl {
        url: url.to_string(),
        key,
    }
}

// ─── HTTP driver ─────────────────────────────────────────────────────────────

pub struct HttpBlobStore {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    access_key: Option<String>,
    secret_key: Option<String>,
    max_bytes: usize,
}

impl HttpBlobStore {
    pub fn new(cfg: &BlobConfig) -> Result<Self, BlobError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            bucket: cfg.bucket.clone(),
            access_key: cfg.access_key.clone(),
            secret_key: cfg.secret_key.clone(),
            max_bytes: cfg.max_image_bytes,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key.trim_start_matches('/'))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.access_key, &self.secret_key) {
            (Some(user), secret) => req.basic_auth(user, secret.as_deref()),
            _ => req,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let url = self.object_url(key);
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;

        match resp.status() {
            s if s.is_success() => {
                if let Some(len) = resp.content_length() {
                    if len as usize > self.max_bytes {
                        return Err(BlobError::TooLarge {
                            key: key.to_string(),
                            size: len as usize,
                            cap: self.max_bytes,
                        });
                    }
                }
                let bytes = resp
                    .bytes()
                    .await
                    .map_err(|e| BlobError::Unavailable(e.to_string()))?;
                // Stores that stream chunked responses report no length up
                // front; enforce the cap on the materialized body as well.
                if bytes.len() > self.max_bytes {
                    return Err(BlobError::TooLarge {
                        key: key.to_string(),
                        size: bytes.len(),
                        cap: self.max_bytes,
                    });
                }
                debug!(key, size = bytes.len(), "fetched blob");
                Ok(bytes.to_vec())
            }
            reqwest::StatusCode::NOT_FOUND => Err(BlobError::NotFound(key.to_string())),
            s => Err(BlobError::Status {
                key: key.to_string(),
                status: s.as_u16(),
            }),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, BlobError> {
        let url = self.object_url(key);
        let resp = self
            .authed(self.http.put(&url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BlobError::Status {
                key: key.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(self.public_url(key))
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        let url = self.object_url(key);
        let resp = self
            .authed(self.http.head(&url))
            .send()
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;
        Ok(resp.status().is_success())
    }

    fn public_url(&self, key: &str) -> String {
        self.object_url(key)
    }
}

// ─── In-memory double ────────────────────────────────────────────────────────

/// In-process blob store for tests and local experiments. Same URL shape as
/// the HTTP driver so canonicalization round-trips.
#[derive(Default)]
pub struct MemoryBlobStore {
    endpoint: String,
    bucket: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-load an object, bypassing the async API. Test convenience.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.into(), bytes);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, BlobError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(self.public_url(key))
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            key.trim_start_matches('/')
        )
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
