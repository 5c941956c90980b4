// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use tracing::debug;

use crate::{BlobConfig, BrokerConfig, Config, EncoderConfig, PortalConfig, VectorConfig};

/// Load configuration from process environment variables, falling back to
/// the documented defaults for anything unset.
pub fn from_env() -> Config {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary lookup function. `from_env` is this
/// with `std::env::var`; tests pass a closure over a map so they never
/// mutate process state.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Config {
    let defaults = Config::default();

    let broker = BrokerConfig {
        url: get(&lookup, "AMQP_URL", defaults.broker.url),
        exchange: get(&lookup, "EVENTS_EXCHANGE", defaults.broker.exchange),
        prefetch: get_parsed(&lookup, "CONSUMER_PREFETCH", defaults.broker.prefetch).clamp(1, 10),
        publish_timeout_secs: get_parsed(
            &lookup,
            "PUBLISH_TIMEOUT_SECS",
            defaults.broker.publish_timeout_secs,
        ),
        shutdown_grace_secs: get_parsed(
            &lookup,
            "SHUTDOWN_GRACE_SECS",
            defaults.broker.shutdown_grace_secs,
        ),
    };

    let blob = BlobConfig {
        endpoint: get(&lookup, "BLOB_ENDPOINT", defaults.blob.endpoint),
        bucket: get(&lookup, "BLOB_BUCKET", defaults.blob.bucket),
        access_key: lookup("BLOB_ACCESS_KEY"),
        secret_key: lookup("BLOB_SECRET_KEY"),
        max_image_bytes: get_parsed(
            &lookup,
            "BLOB_MAX_IMAGE_BYTES",
            defaults.blob.max_image_bytes,
        ),
        timeout_secs: get_parsed(&lookup, "BLOB_TIMEOUT_SECS", defaults.blob.timeout_secs),
    };

    let encoder = EncoderConfig {
        url: get(&lookup, "ENCODER_URL", defaults.encoder.url),
        api_key: lookup("ENCODER_API_KEY"),
        timeout_secs: get_parsed(&lookup, "ENCODER_TIMEOUT_SECS", defaults.encoder.timeout_secs),
    };

    let vector = VectorConfig {
        url: get(&lookup, "QDRANT_URL", defaults.vector.url),
        collection: get(&lookup, "VECTOR_COLLECTION", defaults.vector.collection),
        api_key: lookup("QDRANT_API_KEY"),
        timeout_secs: get_parsed(&lookup, "VECTOR_TIMEOUT_SECS", defaults.vector.timeout_secs),
    };

    let portal = PortalConfig {
        base_url: get(&lookup, "PORTAL_BASE_URL", defaults.portal.base_url),
        email: get(&lookup, "PORTAL_EMAIL", defaults.portal.email),
        password: get(&lookup, "PORTAL_PASSWORD", defaults.portal.password),
        dataset_id: lookup("PORTAL_DATASET_ID").filter(|v| !v.trim().is_empty()),
        organization_id: lookup("PORTAL_ORGANIZATION_ID").filter(|v| !v.trim().is_empty()),
        timeout_secs: get_parsed(&lookup, "PORTAL_TIMEOUT_SECS", defaults.portal.timeout_secs),
    };

    Config {
        broker,
        blob,
        encoder,
        vector,
        portal,
    }
}

fn get(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: String) -> String {
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}

/// Parse an env value, keeping the default on absent or unparseable input.
/// A bad value is logged rather than fatal: a worker with a typo'd prefetch
/// should come up with the safe default, not crash-loop.
fn get_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                debug!(key, value = %raw, "unparseable env value, using default");
                default
            }
        },
        None => default,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
