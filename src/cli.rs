// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "zguby", version, about = "Lost-and-found ingestion pipeline workers")]
pub struct Cli {
    /// Log to stderr at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the embedder worker (q.lost-items.embed ← item.submitted)
    Embedder,
    /// Run the indexer worker (q.lost-items.ingest ← item.embedded)
    Indexer,
    /// Run the publisher worker (q.lost-items.publish + q.datasets.publish)
    Publisher,
    /// Run the status reconciler against the in-process metadata store
    /// (development harness; in production it is embedded in the gateway)
    Reconciler,
    /// Run the legacy file converter (q.datasets.process ← dataset.submitted)
    Converter,
    /// Run every worker in one process (the local development setup)
    All,
    /// Declare the exchange, queues, and bindings idempotently, then exit
    Topology,
    /// Query the semantic index from the command line
    Search(SearchArgs),
    /// Print the effective configuration as YAML
    ShowConfig,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-text query
    pub query: String,

    /// Only return items with this exact category label
    #[arg(long)]
    pub category: Option<String>,

    /// Only return items whose location mentions this keyword
    #[arg(long)]
    pub location: Option<String>,

    /// Maximum number of results
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Minimum cosine similarity for a result to be shown
    #[arg(long, default_value_t = zguby_vector::DEFAULT_SCORE_THRESHOLD)]
    pub threshold: f32,
}
