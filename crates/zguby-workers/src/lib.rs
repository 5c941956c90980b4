// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The pipeline stages.
//!
//! Each stage is an [`zguby_broker::EventHandler`]: one consumed routing
//! key, one transformation, zero or more emitted events. Stages hold their
//! collaborators (blob store, encoder, vector store, portal, item store) as
//! injected trait handles; there is no process-wide state, which is also
//! what makes every stage testable without a broker.

mod converter;
mod embedder;
mod indexer;
mod items;
mod publisher;
mod reconciler;

pub use converter::{explode, ConvertError, LegacyConverter};
pub use embedder::Embedder;
pub use indexer::Indexer;
pub use items::{ItemRecord, ItemStatus, ItemStore, MemoryItemStore, StoreError};
pub use publisher::PortalPublisher;
pub use reconciler::StatusReconciler;
