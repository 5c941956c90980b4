// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions};
use lapin::types::FieldTable;
use lapin::Channel;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zguby_events::Event;

use crate::{BrokerError, EventSink, HandlerError};

/// One pipeline stage: a pure transformation from an input event to zero or
/// more output events. Handlers never see deliveries or channels; the
/// runner owns the ack protocol and the publication of outputs.
///
/// Handlers must be idempotent by `item_id`: the broker guarantees
/// at-least-once, not exactly-once.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Short name used for the consumer tag and log fields.
    fn name(&self) -> &str;

    async fn handle(&self, event: Event) -> Result<Vec<Event>, HandlerError>;
}

/// How a processed delivery leaves the queue.
#[derive(Debug, PartialEq, Eq)]
enum Disposition {
    Ack,
    Nack { requeue: bool },
}

fn disposition_for(result: &Result<(), HandlerError>) -> Disposition {
    match result {
        Ok(()) => Disposition::Ack,
        Err(err) => Disposition::Nack { requeue: err.requeue() },
    }
}

/// Consume `queue` until the token is cancelled.
///
/// Per delivery: decode through the event boundary (undecodable bodies are
/// rejected without requeue), run the handler, publish its outputs through
/// `sink`, then ack. The handler races against shutdown so an in-flight
/// message is returned to the queue instead of being held through the grace
/// period.
/// A failed output publish requeues the input; stages are idempotent so the
/// replay is safe.
pub async fn run_consumer(
    channel: Channel,
    queue: &str,
    prefetch: u16,
    handler: Arc<dyn EventHandler>,
    sink: Arc<dyn EventSink>,
    shutdown: CancellationToken,
) -> Result<(), BrokerError> {
    channel
        .basic_qos(prefetch, BasicQosOptions::default())
        .await?;
    let mut consumer = channel
        .basic_consume(
            queue,
            handler.name(),
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    info!(queue, consumer = handler.name(), prefetch, "consuming");

    loop {
        let delivery = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(queue, "shutdown requested, stopping consumer");
                return Ok(());
            }
            next = consumer.next() => match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(err)) => return Err(err.into()),
                None => {
                    warn!(queue, "consumer stream closed by broker");
                    return Ok(());
                }
            },
        };
        process_delivery(delivery, queue, handler.as_ref(), sink.as_ref(), &shutdown).await?;
    }
}

async fn process_delivery(
    delivery: Delivery,
    queue: &str,
    handler: &dyn EventHandler,
    sink: &dyn EventSink,
    shutdown: &CancellationToken,
) -> Result<(), BrokerError> {
    let routing_key = delivery.routing_key.as_str().to_string();

    let event = match Event::decode(&routing_key, &delivery.data) {
        Ok(event) => event,
        Err(err) => {
            error!(queue, %routing_key, error = %err, "undecodable message, rejecting");
            delivery
                .acker
                .nack(BasicNackOptions { requeue: false, ..Default::default() })
                .await?;
            return Ok(());
        }
    };
    let item_id = event.item_id();

    // Race the handler against shutdown: an in-flight message goes back on
    // the queue, which is safe because every stage is idempotent by item_id.
    let outcome = tokio::select! {
        _ = shutdown.cancelled() => {
            info!(queue, %routing_key, "shutdown during handling, requeueing delivery");
            delivery
                .acker
                .nack(BasicNackOptions { requeue: true, ..Default::default() })
                .await?;
            return Ok(());
        }
        result = handler.handle(event) => result,
    };

    let result = match outcome {
        Ok(outputs) => {
            let mut published = Ok(());
            for output in &outputs {
                if let Err(err) = sink.publish(output).await {
                    published = Err(HandlerError::transient(format!(
                        "publishing {} failed: {err}",
                        output.routing_key()
                    )));
                    break;
                }
            }
            published
        }
        Err(err) => Err(err),
    };

    match disposition_for(&result) {
        Disposition::Ack => {
            debug!(queue, %routing_key, item_id = ?item_id, "acked");
            delivery.acker.ack(BasicAckOptions::default()).await?;
        }
        Disposition::Nack { requeue } => {
            let err = result.unwrap_err();
            if requeue {
                warn!(queue, %routing_key, item_id = ?item_id, error = %err, "requeueing");
            } else {
                error!(queue, %routing_key, item_id = ?item_id, error = %err, "rejecting");
            }
            delivery
                .acker
                .nack(BasicNackOptions { requeue, ..Default::default() })
                .await?;
        }
    }
    Ok(())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_acks() {
        assert_eq!(disposition_for(&Ok(())), Disposition::Ack);
    }

    #[test]
    fn transient_requeues() {
        let result = Err(HandlerError::transient("portal 503"));
        assert_eq!(disposition_for(&result), Disposition::Nack { requeue: true });
    }

    #[test]
    fn malformed_and_permanent_reject_without_requeue() {
        for err in [HandlerError::malformed("384-dim"), HandlerError::permanent("portal 422")] {
            assert_eq!(disposition_for(&Err(err)), Disposition::Nack { requeue: false });
        }
    }
}
