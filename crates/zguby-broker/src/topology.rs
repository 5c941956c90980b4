// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The fixed broker topology.
//!
//! One durable topic exchange, six durable queues, each bound by the keys
//! listed in [`BINDINGS`]. Declaration is idempotent and runs on every
//! worker startup, so the first component to come up bootstraps the broker
//! for everyone.

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};
use tracing::debug;
use zguby_events::keys;

use crate::BrokerError;

pub mod queues {
    pub const EMBED: &str = "q.lost-items.embed";
    pub const INGEST: &str = "q.lost-items.ingest";
    pub const PUBLISH: &str = "q.lost-items.publish";
    pub const DATASETS_PUBLISH: &str = "q.datasets.publish";
    pub const DATASETS_PROCESS: &str = "q.datasets.process";
    /// Private status queue of the intake gateway, bound to two keys.
    pub const GATEWAY_STATUS: &str = "q.gateway.status";
}

/// Queue → binding keys. The historical `q.lost-items.ingest ←
/// item.submitted` binding is deliberately absent: the three-stage topology
/// is the only one declared.
pub const BINDINGS: &[(&str, &[&str])] = &[
    (queues::EMBED, &[keys::ITEM_SUBMITTED]),
    (queues::INGEST, &[keys::ITEM_EMBEDDED]),
    (queues::PUBLISH, &[keys::ITEM_VECTORIZED]),
    (queues::DATASETS_PUBLISH, &[keys::DATASET_PUBLISH]),
    (queues::DATASETS_PROCESS, &[keys::DATASET_SUBMITTED]),
    (queues::GATEWAY_STATUS, &[keys::ITEM_EMBEDDED, keys::ITEM_VECTORIZED]),
];

/// Declare the exchange, all queues, and all bindings on `channel`.
pub async fn declare(channel: &Channel, exchange: &str) -> Result<(), BrokerError> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    for (queue, binding_keys) in BINDINGS {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        for key in *binding_keys {
            channel
                .queue_bind(queue, exchange, key, QueueBindOptions::default(), FieldTable::default())
                .await?;
        }
        debug!(queue, keys = ?binding_keys, "declared queue");
    }
    Ok(())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pipeline_key_has_exactly_one_worker_queue() {
        // The gateway status queue is a fan-out observer; excluding it, each
        // routing key feeds exactly one queue.
        for key in [
            keys::ITEM_SUBMITTED,
            keys::ITEM_EMBEDDED,
            keys::ITEM_VECTORIZED,
            keys::DATASET_PUBLISH,
            keys::DATASET_SUBMITTED,
        ] {
            let consumers = BINDINGS
                .iter()
                .filter(|(queue, _)| *queue != queues::GATEWAY_STATUS)
                .filter(|(_, binding_keys)| binding_keys.contains(&key))
                .count();
            assert_eq!(consumers, 1, "{key} must have exactly one worker queue");
        }
    }

    #[test]
    fn legacy_submitted_binding_on_ingest_is_gone() {
        let (_, ingest_keys) = BINDINGS
            .iter()
            .find(|(queue, _)| *queue == queues::INGEST)
            .unwrap();
        assert!(!ingest_keys.contains(&keys::ITEM_SUBMITTED));
        assert_eq!(*ingest_keys, [keys::ITEM_EMBEDDED]);
    }

    #[test]
    fn status_queue_observes_both_progress_keys() {
        let (_, status_keys) = BINDINGS
            .iter()
            .find(|(queue, _)| *queue == queues::GATEWAY_STATUS)
            .unwrap();
        assert!(status_keys.contains(&keys::ITEM_EMBEDDED));
        assert!(status_keys.contains(&keys::ITEM_VECTORIZED));
    }

    #[test]
    fn published_events_have_no_queue_yet() {
        // item.published / dataset.published are consumed by the gateway
        // outside this repo; nothing here may bind them by accident.
        for (_, binding_keys) in BINDINGS {
            assert!(!binding_keys.contains(&keys::ITEM_PUBLISHED));
            assert!(!binding_keys.contains(&keys::DATASET_PUBLISHED));
        }
    }
}
