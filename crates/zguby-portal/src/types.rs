// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::PortalError;

/// Wire format tag of a published resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceFormat {
    Json,
    Jpeg,
}

impl ResourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceFormat::Json => "JSON",
            ResourceFormat::Jpeg => "JPEG",
        }
    }
}

/// A resource to be attached to an existing portal dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDraft {
    pub title: String,
    pub description: String,
    /// Public link the resource points at (the item photo, when present).
    pub link: String,
    pub format: ResourceFormat,
    /// DCAT-style keyword tags derived from the item category.
    pub tags: Vec<String>,
    /// EU data-theme URI derived from the item category.
    pub theme: String,
    /// Free-text spatial label derived from the item location, when any.
    pub spatial: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedResource {
    /// Portal-assigned resource id.
    pub resource_id: String,
    /// Public URL of the resource on the portal.
    pub url: String,
}

/// A dataset-submission document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDraft {
    pub title: String,
    pub notes: String,
    pub url: String,
    pub institution_name: String,
    pub email: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedDataset {
    /// Portal-assigned dataset id.
    pub dataset_id: String,
    /// Public URL of the dataset on the portal.
    pub url: String,
}

/// The authenticated portal surface consumed by the publisher stage.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Attach a resource to an existing dataset.
    async fn create_resource(
        &self,
        dataset_id: &str,
        draft: &ResourceDraft,
    ) -> Result<PublishedResource, PortalError>;

    /// Create a dataset.
    async fn create_dataset(&self, draft: &DatasetDraft) -> Result<PublishedDataset, PortalError>;
}
