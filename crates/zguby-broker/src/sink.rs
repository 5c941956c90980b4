// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Mutex;

use async_trait::async_trait;
use zguby_events::Event;

use crate::BrokerError;

/// Where a consumer's output events go. The broker-backed implementation is
/// [`crate::Publisher`]; [`MemorySink`] collects events in process for tests
/// and for the in-memory pipeline harness.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &Event) -> Result<(), BrokerError>;
}

/// Collects published events in memory.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Drain the collected events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Events published under the given routing key.
    pub fn by_key(&self, routing_key: &str) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.routing_key() == routing_key)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn publish(&self, event: &Event) -> Result<(), BrokerError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
