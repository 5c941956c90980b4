// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Command, SearchArgs};
use zguby_blob::HttpBlobStore;
use zguby_broker::topology::{self, queues};
use zguby_broker::{run_consumer, EventHandler, Publisher};
use zguby_config::{Config, EncoderConfig};
use zguby_embed::{Encoder, HttpEncoder, MockEncoder};
use zguby_portal::HttpPortal;
use zguby_vector::{QdrantStore, SearchFilter, SearchParams, VectorStore};
use zguby_workers::{
    Embedder, Indexer, LegacyConverter, MemoryItemStore, PortalPublisher, StatusReconciler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = zguby_config::from_env();

    match cli.command {
        Command::ShowConfig => {
            println!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Command::Topology => declare_topology(&config).await,
        Command::Search(args) => search(&config, args).await,
        Command::Embedder => run_workers(&config, &[Role::Embedder]).await,
        Command::Indexer => run_workers(&config, &[Role::Indexer]).await,
        Command::Publisher => run_workers(&config, &[Role::Publisher]).await,
        Command::Reconciler => run_workers(&config, &[Role::Reconciler]).await,
        Command::Converter => run_workers(&config, &[Role::Converter]).await,
        Command::All => {
            run_workers(
                &config,
                &[
                    Role::Embedder,
                    Role::Indexer,
                    Role::Publisher,
                    Role::Reconciler,
                    Role::Converter,
                ],
            )
            .await
        }
    }
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

// ── Worker roles ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Embedder,
    Indexer,
    Publisher,
    Reconciler,
    Converter,
}

impl Role {
    /// The queues this role consumes. The portal publisher runs one session
    /// per queue, both feeding the same handler.
    fn queues(&self) -> &'static [&'static str] {
        match self {
            Role::Embedder => &[queues::EMBED],
            Role::Indexer => &[queues::INGEST],
            Role::Publisher => &[queues::PUBLISH, queues::DATASETS_PUBLISH],
            Role::Reconciler => &[queues::GATEWAY_STATUS],
            Role::Converter => &[queues::DATASETS_PROCESS],
        }
    }

    async fn handler(&self, config: &Config) -> anyhow::Result<Arc<dyn EventHandler>> {
        Ok(match self {
            Role::Embedder => {
                let blob = Arc::new(HttpBlobStore::new(&config.blob)?);
                let encoder = build_encoder(&config.encoder)?;
                Arc::new(Embedder::new(blob, encoder, config.blob.clone()))
            }
            Role::Indexer => {
                let store = Arc::new(QdrantStore::new(&config.vector)?);
                store
                    .ensure_collection()
                    .await
                    .context("ensuring vector collection")?;
                Arc::new(Indexer::new(store))
            }
            Role::Publisher => {
                let portal = Arc::new(HttpPortal::new(&config.portal)?);
                Arc::new(PortalPublisher::new(
                    portal,
                    config.portal.dataset_id.clone(),
                ))
            }
            Role::Reconciler => Arc::new(StatusReconciler::new(Arc::new(MemoryItemStore::new()))),
            Role::Converter => Arc::new(LegacyConverter::new()),
        })
    }
}

/// Select the encoder driver. The reserved URL `mock` runs the pipeline
/// without the encoder sidecar (deterministic vectors, local development
/// only).
fn build_encoder(cfg: &EncoderConfig) -> anyhow::Result<Arc<dyn Encoder>> {
    if cfg.url == "mock" {
        info!("using the deterministic mock encoder");
        return Ok(Arc::new(MockEncoder));
    }
    Ok(Arc::new(HttpEncoder::new(cfg)?))
}

async fn run_workers(config: &Config, roles: &[Role]) -> anyhow::Result<()> {
    let conn = zguby_broker::connect(&config.broker).await?;

    // Any worker bootstraps the broker; declaration is idempotent.
    let setup = conn.create_channel().await?;
    topology::declare(&setup, &config.broker.exchange).await?;

    let shutdown = CancellationToken::new();
    let mut tasks = Vec::new();

    for role in roles {
        let handler = role.handler(config).await?;
        for &queue in role.queues() {
            // One channel per consumer session, one per publisher; a
            // channel is never shared between the two.
            let channel = conn.create_channel().await?;
            let sink = Arc::new(Publisher::new(&conn, &config.broker).await?);
            let handler = handler.clone();
            let token = shutdown.clone();
            let prefetch = config.broker.prefetch;
            tasks.push(tokio::spawn(async move {
                if let Err(err) =
                    run_consumer(channel, queue, prefetch, handler, sink, token).await
                {
                    error!(queue, error = %err, "consumer terminated");
                }
            }));
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    shutdown.cancel();

    let deadline =
        tokio::time::Instant::now() + Duration::from_secs(config.broker.shutdown_grace_secs);
    for task in tasks {
        if tokio::time::timeout_at(deadline, task).await.is_err() {
            error!("consumer did not stop within the grace period");
            break;
        }
    }
    conn.close(200, "shutdown").await.ok();
    Ok(())
}

// ── One-shot commands ─────────────────────────────────────────────────────────

async fn declare_topology(config: &Config) -> anyhow::Result<()> {
    let conn = zguby_broker::connect(&config.broker).await?;
    let channel = conn.create_channel().await?;
    topology::declare(&channel, &config.broker.exchange).await?;
    info!(exchange = %config.broker.exchange, "topology declared");
    conn.close(200, "done").await.ok();
    Ok(())
}

async fn search(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let encoder = build_encoder(&config.encoder)?;
    let store = QdrantStore::new(&config.vector)?;

    let vector = encoder
        .encode_text(args.query.trim())
        .await
        .context("encoding query")?;
    let params = SearchParams {
        limit: args.limit,
        score_threshold: args.threshold,
        filter: SearchFilter {
            category: args.category,
            location: args.location,
        },
        ..Default::default()
    };
    let hits = store.search(&vector, &params).await?;

    if hits.is_empty() {
        println!("no matches above score {:.2}", args.threshold);
        return Ok(());
    }
    for hit in hits {
        println!(
            "{:.3}  {}  [{}]  {}  ({})",
            hit.score, hit.payload.title, hit.payload.category, hit.payload.location, hit.id
        );
    }
    Ok(())
}
