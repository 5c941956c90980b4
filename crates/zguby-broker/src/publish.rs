// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::{BasicProperties, Channel, Connection};
use tracing::warn;
use uuid::Uuid;
use zguby_config::BrokerConfig;
use zguby_events::Event;

use crate::{BrokerError, EventSink};

/// Bounded attempts for one logical publish.
pub const PUBLISH_ATTEMPTS: u32 = 5;
/// First retry delay; doubles per attempt.
pub const BACKOFF_BASE: Duration = Duration::from_millis(250);
/// Ceiling for the per-attempt delay.
pub const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Delay before retry number `attempt` (0-based): `base · 2^attempt`,
/// capped.
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u32 << attempt.min(16);
    BACKOFF_BASE.saturating_mul(factor).min(BACKOFF_CAP)
}

/// Confirmed publisher. Owns its channel; never share it with a consumer.
///
/// Every publish is persistent, `application/json`, stamped with a fresh
/// message id and the current UNIX timestamp, and blocks until the broker
/// confirms. That blocking is how broker backpressure propagates to
/// producers instead of messages being silently dropped.
pub struct Publisher {
    channel: Channel,
    exchange: String,
    timeout: Duration,
}

impl Publisher {
    pub async fn new(conn: &Connection, cfg: &BrokerConfig) -> Result<Self, BrokerError> {
        let channel = conn.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        Ok(Self {
            channel,
            exchange: cfg.exchange.clone(),
            timeout: Duration::from_secs(cfg.publish_timeout_secs),
        })
    }

    async fn publish_once(&self, event: &Event) -> Result<(), BrokerError> {
        let routing_key = event.routing_key();
        let payload = event.to_bytes()?;
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(2) // persistent
            .with_message_id(Uuid::new_v4().to_string().into())
            .with_timestamp(Utc::now().timestamp().max(0) as u64);

        let confirmation = tokio::time::timeout(self.timeout, async {
            let confirm = self
                .channel
                .basic_publish(
                    &self.exchange,
                    routing_key,
                    BasicPublishOptions::default(),
                    &payload,
                    properties,
                )
                .await?;
            confirm.await
        })
        .await
        .map_err(|_| BrokerError::PublishTimeout(self.timeout))??;

        match confirmation {
            Confirmation::Nack(_) => Err(BrokerError::PublishNacked { routing_key }),
            Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
        }
    }

    /// Publish with confirm and bounded exponential backoff. All producer
    /// retry behavior in the pipeline funnels through here.
    pub async fn publish(&self, event: &Event) -> Result<(), BrokerError> {
        let routing_key = event.routing_key();
        let mut attempt = 0u32;
        loop {
            match self.publish_once(event).await {
                Ok(()) => return Ok(()),
                // Serialization cannot improve with retries.
                Err(err @ BrokerError::Event(_)) => return Err(err),
                Err(err) => {
                    attempt += 1;
                    if attempt >= PUBLISH_ATTEMPTS {
                        return Err(BrokerError::PublishExhausted {
                            routing_key,
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    let delay = backoff_delay(attempt - 1);
                    warn!(
                        routing_key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "publish failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl EventSink for Publisher {
    async fn publish(&self, event: &Event) -> Result<(), BrokerError> {
        Publisher::publish(self, event).await
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
