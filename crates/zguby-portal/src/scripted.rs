// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    DatasetDraft, Portal, PortalError, PublishedDataset, PublishedResource, ResourceDraft,
};

/// Scripted outcome for one portal call.
#[derive(Debug, Clone)]
pub enum Script {
    Ok,
    ServerError(u16),
    Rejected(u16),
    AuthExpired,
    Unreachable,
}

/// Pre-scripted portal double. Each call pops the next [`Script`] from its
/// queue; an empty queue means success. Every accepted draft is recorded so
/// tests can assert on exactly what would have been published.
#[derive(Default)]
pub struct ScriptedPortal {
    scripts: Mutex<VecDeque<Script>>,
    counter: Mutex<u64>,
    /// Every resource accepted, with the dataset it was attached to.
    pub resources: Mutex<Vec<(String, ResourceDraft)>>,
    /// Every dataset accepted.
    pub datasets: Mutex<Vec<DatasetDraft>>,
}

impl ScriptedPortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for upcoming calls, oldest first.
    pub fn script(self, outcomes: impl IntoIterator<Item = Script>) -> Self {
        self.scripts.lock().unwrap().extend(outcomes);
        self
    }

    fn next_outcome(&self) -> Result<u64, PortalError> {
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or(Script::Ok);
        match script {
            Script::Ok => {
                let mut counter = self.counter.lock().unwrap();
                *counter += 1;
                Ok(*counter)
            }
            Script::ServerError(status) => Err(PortalError::Server { status }),
            Script::Rejected(status) => Err(PortalError::Rejected {
                status,
                body: "scripted rejection".into(),
            }),
            Script::AuthExpired => Err(PortalError::Auth("scripted 401".into())),
            Script::Unreachable => Err(PortalError::Unavailable("scripted outage".into())),
        }
    }

    pub fn resource_count(&self) -> usize {
        self.resources.lock().unwrap().len()
    }
}

#[async_trait]
impl Portal for ScriptedPortal {
    async fn create_resource(
        &self,
        dataset_id: &str,
        draft: &ResourceDraft,
    ) -> Result<PublishedResource, PortalError> {
        let n = self.next_outcome()?;
        self.resources
            .lock()
            .unwrap()
            .push((dataset_id.to_string(), draft.clone()));
        Ok(PublishedResource {
            resource_id: format!("res-{n}"),
            url: format!("https://dane.gov.pl/resource/res-{n}"),
        })
    }

    async fn create_dataset(&self, draft: &DatasetDraft) -> Result<PublishedDataset, PortalError> {
        let n = self.next_outcome()?;
        self.datasets.lock().unwrap().push(draft.clone());
        Ok(PublishedDataset {
            dataset_id: format!("ds-{n}"),
            url: format!("https://dane.gov.pl/dataset/ds-{n}"),
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceFormat;

    fn draft() -> ResourceDraft {
        ResourceDraft {
            title: "Portfel".into(),
            description: "Czarny skórzany".into(),
            link: String::new(),
            format: ResourceFormat::Json,
            tags: vec![],
            theme: String::new(),
            spatial: None,
        }
    }

    #[tokio::test]
    async fn unscripted_calls_succeed_with_fresh_ids() {
        let portal = ScriptedPortal::new();
        let a = portal.create_resource("ds", &draft()).await.unwrap();
        let b = portal.create_resource("ds", &draft()).await.unwrap();
        assert_ne!(a.resource_id, b.resource_id);
        assert_eq!(portal.resource_count(), 2);
    }

    #[tokio::test]
    async fn scripted_failures_pop_in_order() {
        let portal = ScriptedPortal::new().script([Script::ServerError(503), Script::Ok]);
        let err = portal.create_resource("ds", &draft()).await.unwrap_err();
        assert!(matches!(err, PortalError::Server { status: 503 }));
        assert!(portal.create_resource("ds", &draft()).await.is_ok());
        assert_eq!(portal.resource_count(), 1, "failed call must record nothing");
    }
}
