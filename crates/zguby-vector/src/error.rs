// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    /// Vector length does not match the collection dimension. Rejected at
    /// the boundary, never stored.
    #[error("vector has {got} dimensions, collection requires {want}")]
    Dimension { got: usize, want: usize },

    /// Network-level failure or timeout; retryable.
    #[error("vector store unavailable: {0}")]
    Unavailable(String),

    /// Unexpected HTTP status from the store.
    #[error("vector store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The store answered with a body we could not interpret.
    #[error("unparseable vector store response: {0}")]
    Response(String),
}

impl VectorError {
    /// Whether retrying later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            VectorError::Unavailable(_) => true,
            VectorError::Status { status, .. } => *status >= 500,
            VectorError::Dimension { .. } | VectorError::Response(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_is_permanent() {
        assert!(!VectorError::Dimension { got: 384, want: 512 }.is_transient());
    }

    #[test]
    fn unavailability_is_transient() {
        assert!(VectorError::Unavailable("connect refused".into()).is_transient());
        let err = VectorError::Status { status: 502, body: String::new() };
        assert!(err.is_transient());
    }
}
