// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The semantic-search index maintained by the indexer stage.
//!
//! [`VectorStore`] is the abstract collection contract: create-collection,
//! upsert, filtered nearest-neighbor search, get, delete.
//! [`QdrantStore`] drives a Qdrant instance over its REST API;
//! [`MemoryStore`] is an exact-scan implementation with identical ordering
//! semantics, used by tests and available for single-process deployments.

mod error;
mod memory;
mod qdrant;
mod store;

pub use error::VectorError;
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;
pub use store::{
    check_dim, PointPayload, ScoredPoint, SearchFilter, SearchParams, VectorPoint, VectorStore,
    DEFAULT_HNSW_EF, DEFAULT_SCORE_THRESHOLD, HNSW_EF_CONSTRUCT, HNSW_M,
};
