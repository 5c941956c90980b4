// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    /// 401 that survived one token refresh. Treated as transient: the
    /// account may be mid-rotation on the portal side.
    #[error("portal authentication failed: {0}")]
    Auth(String),

    /// Non-auth 4xx: the portal understood the request and said no.
    /// Permanent for this message.
    #[error("portal rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// 5xx from the portal; retryable.
    #[error("portal server error {status}")]
    Server { status: u16 },

    /// Network-level failure or timeout; retryable.
    #[error("portal unreachable: {0}")]
    Unavailable(String),

    /// The portal answered 2xx with a body we could not interpret.
    #[error("unparseable portal response: {0}")]
    Response(String),
}

impl PortalError {
    /// Whether retrying later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortalError::Auth(_) | PortalError::Server { .. } | PortalError::Unavailable(_)
        )
    }
}
