// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Event payloads exchanged over the `lost-found.events` topic exchange.
//!
//! Every message on the bus is JSON with a schema fixed by its routing key.
//! This crate is the single (de)serialization boundary: producers build an
//! [`Event`] variant and consumers decode deliveries through
//! [`Event::decode`], so silently-optional fields and ad-hoc payload shapes
//! cannot creep back in.

mod item;
mod payload;

pub use item::{Category, ItemSubmitted, CATEGORIES};
pub use payload::{
    DatasetPublish, DatasetPublished, DatasetSubmitted, Event, EventError, ItemEmbedded,
    ItemPublished, ItemVectorized,
};

/// Dimension of the joint text+image embedding carried by `item.embedded`.
/// Messages whose embedding differs in length are permanently rejected.
pub const EMBEDDING_DIM: usize = 512;

/// Routing keys, one per event schema. The topic exchange routes a published
/// message to every queue whose binding matches one of these.
pub mod keys {
    pub const ITEM_SUBMITTED: &str = "item.submitted";
    pub const ITEM_EMBEDDED: &str = "item.embedded";
    pub const ITEM_VECTORIZED: &str = "item.vectorized";
    pub const ITEM_PUBLISHED: &str = "item.published";
    pub const DATASET_PUBLISH: &str = "dataset.publish";
    pub const DATASET_PUBLISHED: &str = "dataset.published";
    pub const DATASET_SUBMITTED: &str = "dataset.submitted";
}
