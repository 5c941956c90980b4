// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncoderError {
    /// Network failure or timeout talking to the encoder service.
    #[error("encoder unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status.
    #[error("encoder returned status {0}")]
    Status(u16),

    /// The service returned a vector of the wrong length. This is a
    /// deployment mismatch, not a per-message problem.
    #[error("encoder returned {got}-dim vector, expected {want}")]
    Dimension { got: usize, want: usize },

    /// The response body did not parse.
    #[error("unparseable encoder response: {0}")]
    Response(String),
}

impl EncoderError {
    /// Whether retrying later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EncoderError::Unavailable(_) => true,
            EncoderError::Status(s) => *s >= 500,
            EncoderError::Dimension { .. } | EncoderError::Response(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_of_encoder_errors() {
        assert!(EncoderError::Unavailable("timeout".into()).is_transient());
        assert!(EncoderError::Status(503).is_transient());
        assert!(!EncoderError::Status(422).is_transient());
        assert!(!EncoderError::Dimension { got: 384, want: 512 }.is_transient());
    }
}
