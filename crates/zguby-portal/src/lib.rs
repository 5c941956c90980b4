// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Client for the national open-data portal.
//!
//! The portal speaks JSON:API: a login endpoint that issues a bearer token,
//! and authenticated dataset/resource creation endpoints. [`Portal`] is the
//! seam the publisher stage programs against; [`HttpPortal`] is the real
//! client, with the token modelled as internal state refreshed once on 401.
//! [`ScriptedPortal`] backs tests with pre-scripted outcomes.
//!
//! [`dcat`] holds the deterministic category→theme/tag enrichment tables.

pub mod dcat;

mod client;
mod error;
mod scripted;
mod types;

pub use client::HttpPortal;
pub use error::PortalError;
pub use scripted::{Script, ScriptedPortal};
pub use types::{
    DatasetDraft, Portal, PublishedDataset, PublishedResource, ResourceDraft, ResourceFormat,
};
