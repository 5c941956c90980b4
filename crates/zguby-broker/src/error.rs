// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use thiserror::Error;
use zguby_events::EventError;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("broker nacked publish of {routing_key}")]
    PublishNacked { routing_key: &'static str },

    #[error("publish confirm not received within {0:?}")]
    PublishTimeout(Duration),

    #[error("publish of {routing_key} failed after {attempts} attempts: {source}")]
    PublishExhausted {
        routing_key: &'static str,
        attempts: u32,
        #[source]
        source: Box<BrokerError>,
    },
}

/// Classification a consumer handler returns on failure. The consumer
/// runner maps it onto the ack protocol; handlers never touch deliveries.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Missing required field, wrong type, wrong embedding length: the
    /// message can never succeed. Rejected without requeue.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// External party gave a definitive no (non-auth 4xx, unsupported file
    /// format, permanently missing blob). Rejected without requeue.
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// Worth retrying: broker/store/portal unreachable or answering 5xx.
    /// Negatively acknowledged with requeue.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl HandlerError {
    pub fn malformed(msg: impl std::fmt::Display) -> Self {
        HandlerError::Malformed(msg.to_string())
    }

    pub fn permanent(msg: impl std::fmt::Display) -> Self {
        HandlerError::Permanent(msg.to_string())
    }

    pub fn transient(msg: impl std::fmt::Display) -> Self {
        HandlerError::Transient(msg.to_string())
    }

    /// Whether the delivery goes back on the queue.
    pub fn requeue(&self) -> bool {
        matches!(self, HandlerError::Transient(_))
    }
}
