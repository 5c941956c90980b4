// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! RabbitMQ plumbing shared by every pipeline worker.
//!
//! Responsibilities, in order of appearance at startup:
//! - [`connect`]: one connection per process, tokio executor/reactor wired
//!   into lapin.
//! - [`topology`]: idempotent declaration of the exchange, the durable
//!   queues, and their bindings, so any worker can bootstrap the broker.
//! - [`Publisher`]: persistent JSON publishes with publisher confirms and
//!   the single bounded-exponential-backoff retry helper the pipeline's
//!   correctness rests on.
//! - [`run_consumer`]: the consumer loop mapping each handler's error
//!   classification to the right ack/nack, with cooperative shutdown.
//!
//! Producers and consumers never share a channel: the publisher owns one,
//! each consumer session owns its own.

pub mod topology;

mod consume;
mod error;
mod publish;
mod sink;

pub use consume::{run_consumer, EventHandler};
pub use error::{BrokerError, HandlerError};
pub use publish::{backoff_delay, Publisher, BACKOFF_BASE, BACKOFF_CAP, PUBLISH_ATTEMPTS};
pub use sink::{EventSink, MemorySink};

use zguby_config::BrokerConfig;

/// Open the per-process AMQP connection.
pub async fn connect(cfg: &BrokerConfig) -> Result<lapin::Connection, BrokerError> {
    let options = lapin::ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);
    let conn = lapin::Connection::connect(&cfg.url, options).await?;
    tracing::info!(url = %cfg.url, "connected to broker");
    Ok(conn)
}
