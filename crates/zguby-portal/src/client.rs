// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use zguby_config::PortalConfig;

use async_trait::async_trait;

use crate::{
    DatasetDraft, Portal, PortalError, PublishedDataset, PublishedResource, ResourceDraft,
};

const LOGIN_PATH: &str = "/auth/login";
const DATASETS_PATH: &str = "/api/1.4/datasets";
const RESOURCES_PATH: &str = "/api/1.4/resources";

/// JSON:API portal client.
///
/// The bearer token is internal state: acquired lazily on the first
/// authenticated call, cached, and refreshed exactly once when a request
/// comes back 401. A second 401 after refresh surfaces as
/// [`PortalError::Auth`].
pub struct HttpPortal {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    organization_id: Option<String>,
    token: RwLock<Option<String>>,
}

impl HttpPortal {
    pub fn new(cfg: &PortalConfig) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| PortalError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            email: cfg.email.clone(),
            password: cfg.password.clone(),
            organization_id: cfg.organization_id.clone(),
            token: RwLock::new(None),
        })
    }

    async fn login(&self) -> Result<String, PortalError> {
        let body = json!({
            "data": {
                "type": "login",
                "attributes": { "email": self.email, "password": self.password }
            }
        });
        let resp = self
            .http
            .post(format!("{}{LOGIN_PATH}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| PortalError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => PortalError::Auth(format!("login refused: {body}")),
                s if s >= 500 => PortalError::Server { status: s },
                s => PortalError::Rejected { status: s, body },
            });
        }
        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| PortalError::Response(e.to_string()))?;
        let token = parsed["data"]["attributes"]["token"]
            .as_str()
            .ok_or_else(|| PortalError::Response("login response without token".into()))?
            .to_string();
        debug!("portal login succeeded");
        Ok(token)
    }

    async fn cached_token(&self) -> Result<String, PortalError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        let token = self.login().await?;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// POST with bearer auth; on 401, refresh the token and retry once.
    async fn authed_post(&self, path: &str, body: &Value) -> Result<Value, PortalError> {
        let mut refreshed = false;
        loop {
            let token = self.cached_token().await?;
            let resp = self
                .http
                .post(format!("{}{path}", self.base_url))
                .bearer_auth(&token)
                .json(body)
                .send()
                .await
                .map_err(|e| PortalError::Unavailable(e.to_string()))?;
            let status = resp.status();

            if status == reqwest::StatusCode::UNAUTHORIZED {
                if refreshed {
                    return Err(PortalError::Auth("401 after token refresh".into()));
                }
                warn!(path, "portal session expired, refreshing token");
                *self.token.write().await = None;
                refreshed = true;
                continue;
            }
            if status.is_success() {
                return resp
                    .json()
                    .await
                    .map_err(|e| PortalError::Response(e.to_string()));
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(if status.as_u16() >= 500 {
                PortalError::Server { status: status.as_u16() }
            } else {
                PortalError::Rejected { status: status.as_u16(), body }
            });
        }
    }

    fn parse_created(&self, response: &Value, kind: &str) -> Result<(String, String), PortalError> {
        let id = match &response["data"]["id"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err(PortalError::Response(format!("{kind} response without id"))),
        };
        let url = response["data"]["attributes"]["url"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{kind}/{id}", self.base_url));
        Ok((id, url))
    }
}

#[async_trait]
impl Portal for HttpPortal {
    async fn create_resource(
        &self,
        dataset_id: &str,
        draft: &ResourceDraft,
    ) -> Result<PublishedResource, PortalError> {
        let body = json!({
            "data": {
                "type": "resource",
                "attributes": {
                    "title": draft.title,
                    "description": draft.description,
                    "link": draft.link,
                    "format": draft.format.as_str(),
                    "tags": draft.tags,
                    "theme": draft.theme,
                    "spatial": draft.spatial,
                },
                "relationships": {
                    "dataset": { "data": { "type": "dataset", "id": dataset_id } }
                }
            }
        });
        let response = self.authed_post(RESOURCES_PATH, &body).await?;
        let (resource_id, url) = self.parse_created(&response, "resource")?;
        debug!(resource_id, dataset_id, "created portal resource");
        Ok(PublishedResource { resource_id, url })
    }

    async fn create_dataset(&self, draft: &DatasetDraft) -> Result<PublishedDataset, PortalError> {
        let mut data = json!({
            "type": "dataset",
            "attributes": {
                "title": draft.title,
                "notes": draft.notes,
                "url": draft.url,
                "institution_name": draft.institution_name,
                "email": draft.email,
                "categories": draft.categories,
                "tags": draft.tags,
            }
        });
        if let Some(org) = &self.organization_id {
            data["relationships"] = json!({
                "organization": { "data": { "type": "institution", "id": org } }
            });
        }
        let response = self.authed_post(DATASETS_PATH, &json!({ "data": data })).await?;
        let (dataset_id, url) = self.parse_created(&response, "dataset")?;
        debug!(dataset_id, "created portal dataset");
        Ok(PublishedDataset { dataset_id, url })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn portal() -> HttpPortal {
        HttpPortal::new(&PortalConfig {
            base_url: "https://api.dane.gov.pl/".into(),
            email: "bok@um.example.pl".into(),
            password: "secret".into(),
            ..PortalConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(portal().base_url, "https://api.dane.gov.pl");
    }

    #[test]
    fn created_response_with_string_id() {
        let p = portal();
        let resp = json!({ "data": { "id": "abc-1", "attributes": { "url": "https://dane.gov.pl/dataset/abc-1" } } });
        let (id, url) = p.parse_created(&resp, "dataset").unwrap();
        assert_eq!(id, "abc-1");
        assert_eq!(url, "https://dane.gov.pl/dataset/abc-1");
    }

    #[test]
    fn created_response_with_numeric_id_and_no_url() {
        let p = portal();
        let resp = json!({ "data": { "id": 42, "attributes": {} } });
        let (id, url) = p.parse_created(&resp, "resource").unwrap();
        assert_eq!(id, "42");
        assert_eq!(url, "https://api.dane.gov.pl/resource/42");
    }

    #[test]
    fn created_response_without_id_is_unparseable() {
        let p = portal();
        let resp = json!({ "data": { "attributes": {} } });
        assert!(matches!(
            p.parse_created(&resp, "dataset"),
            Err(PortalError::Response(_))
        ));
    }
}
