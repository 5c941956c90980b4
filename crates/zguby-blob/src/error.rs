// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    /// No object under the key. Permanent for the key in question.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The object exceeds the configured image size cap.
    #[error("blob {key} is {size} bytes, over the {cap} byte cap")]
    TooLarge { key: String, size: usize, cap: usize },

    /// Unexpected HTTP status from the store.
    #[error("blob store returned status {status} for {key}")]
    Status { key: String, status: u16 },

    /// Network-level failure; retryable.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

impl BlobError {
    /// Whether retrying later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BlobError::Unavailable(_)) || matches!(self, BlobError::Status { status, .. } if *status >= 500)
    }
}
