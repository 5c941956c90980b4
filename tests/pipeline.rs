// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! End-to-end pipeline scenarios, driven through the in-memory seams: blob
//! store, deterministic encoder, exact-scan vector store, scripted portal,
//! and in-process metadata store. The stage handlers under test are the
//! ones the workers run against RabbitMQ; only the transport is swapped.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use uuid::Uuid;
use zguby_blob::MemoryBlobStore;
use zguby_broker::{EventHandler, HandlerError};
use zguby_config::BlobConfig;
use zguby_embed::MockEncoder;
use zguby_events::{
    Category, DatasetSubmitted, Event, ItemEmbedded, ItemSubmitted, ItemVectorized, EMBEDDING_DIM,
};
use zguby_portal::{Script, ScriptedPortal};
use zguby_vector::{MemoryStore, SearchFilter, SearchParams, VectorStore};
use zguby_workers::{
    Embedder, Indexer, ItemStatus, ItemStore, LegacyConverter, MemoryItemStore, PortalPublisher,
    StatusReconciler,
};

// 1×1 red PNG bytes (valid minimal PNG, CRCs verified by Python zlib)
const MINIMAL_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
    0x77, 0x53, 0xde, 0x00, 0x00, 0x00, 0x0c, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0xf8,
    0xcf, 0xc0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00, 0xc9, 0xfe, 0x92, 0xef, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

const WALLET_ID: &str = "11111111-1111-1111-1111-111111111111";

/// The whole pipeline wired over in-memory collaborators.
struct Pipeline {
    blob: Arc<MemoryBlobStore>,
    vectors: Arc<MemoryStore>,
    portal: Arc<ScriptedPortal>,
    items: Arc<MemoryItemStore>,
    embedder: Embedder,
    indexer: Indexer,
    publisher: PortalPublisher,
    reconciler: StatusReconciler,
}

impl Pipeline {
    fn new(portal: ScriptedPortal, dataset_id: Option<&str>) -> Self {
        let blob_cfg = BlobConfig {
            endpoint: "http://localhost:9000".into(),
            bucket: "lost-items".into(),
            ..BlobConfig::default()
        };
        let blob = Arc::new(MemoryBlobStore::new("http://localhost:9000", "lost-items"));
        let vectors = Arc::new(MemoryStore::new());
        let portal = Arc::new(portal);
        let items = Arc::new(MemoryItemStore::new());

        Self {
            embedder: Embedder::new(blob.clone(), Arc::new(MockEncoder), blob_cfg),
            indexer: Indexer::new(vectors.clone()),
            publisher: PortalPublisher::new(portal.clone(), dataset_id.map(str::to_string)),
            reconciler: StatusReconciler::new(items.clone()),
            blob,
            vectors,
            portal,
            items,
        }
    }

    fn with_defaults() -> Self {
        Self::new(ScriptedPortal::new(), Some("1234"))
    }

    /// Run one item through embedder → indexer, reconciling both progress
    /// events, and return the `item.vectorized` payload.
    async fn embed_and_index(&self, item: ItemSubmitted) -> ItemVectorized {
        let embedded = self
            .embedder
            .handle(Event::ItemSubmitted(item))
            .await
            .expect("embedder")
            .pop()
            .expect("one item.embedded");
        self.reconciler
            .handle(embedded.clone())
            .await
            .expect("reconcile embedded");

        let vectorized = self
            .indexer
            .handle(embedded)
            .await
            .expect("indexer")
            .pop()
            .expect("one item.vectorized");
        self.reconciler
            .handle(vectorized.clone())
            .await
            .expect("reconcile vectorized");

        match vectorized {
            Event::ItemVectorized(v) => v,
            other => panic!("expected item.vectorized, got {}", other.routing_key()),
        }
    }
}

fn wallet_report(image_key: &str) -> ItemSubmitted {
    let mut item = ItemSubmitted::new(Uuid::parse_str(WALLET_ID).unwrap());
    item.title = "Portfel".into();
    item.description = "Czarny skórzany".into();
    item.category = Category::PortfeleITorby;
    item.location = "Dworzec Centralny".into();
    item.image_key = image_key.into();
    item.contact_email = "bok@um.example.pl".into();
    item
}

fn report(id: u128, title: &str, category: Category) -> ItemSubmitted {
    let mut item = ItemSubmitted::new(Uuid::from_u128(id));
    item.title = title.into();
    item.description = format!("Zgłoszenie: {title}");
    item.category = category;
    item
}

// ─── End-to-end scenarios ────────────────────────────────────────────────────

#[tokio::test]
async fn happy_path_with_image() {
    let pipeline = Pipeline::with_defaults();
    pipeline
        .blob
        .insert("uploads/2025-01-15/wallet.jpg", MINIMAL_PNG.to_vec());
    pipeline
        .items
        .insert(wallet_report("uploads/2025-01-15/wallet.jpg"))
        .await
        .unwrap();

    let vectorized = pipeline
        .embed_and_index(wallet_report("uploads/2025-01-15/wallet.jpg"))
        .await;
    assert!(vectorized.has_image_embedding);
    assert_eq!(vectorized.vector_id, Uuid::parse_str(WALLET_ID).unwrap());

    // The collection holds exactly the wallet point, payload hydrated.
    let point = pipeline
        .vectors
        .get(Uuid::parse_str(WALLET_ID).unwrap())
        .await
        .unwrap()
        .expect("point exists");
    assert_eq!(point.payload.title, "Portfel");
    assert_eq!(point.payload.category, "Portfele i torby");
    assert_eq!(point.vector.len(), EMBEDDING_DIM);

    // Publisher attaches the portal resource.
    let published = pipeline
        .publisher
        .handle(Event::ItemVectorized(vectorized))
        .await
        .unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(pipeline.portal.resource_count(), 1);

    // Flags went pending → embedded → vectorized.
    let record = pipeline
        .items
        .get(Uuid::parse_str(WALLET_ID).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(record.embedded && record.vectorized);
    assert_eq!(record.status, ItemStatus::PublishedInPipeline);
}

#[tokio::test]
async fn happy_path_text_only() {
    let pipeline = Pipeline::with_defaults();
    let vectorized = pipeline.embed_and_index(wallet_report("")).await;
    assert!(!vectorized.has_image_embedding);

    let point = pipeline
        .vectors
        .get(Uuid::parse_str(WALLET_ID).unwrap())
        .await
        .unwrap()
        .expect("text-only item still gets a point");
    assert_eq!(point.payload.title, "Portfel");
}

#[tokio::test]
async fn degraded_image_still_reaches_the_collection() {
    // The image key points at nothing; the pipeline degrades instead of
    // requeueing.
    let pipeline = Pipeline::with_defaults();
    let vectorized = pipeline
        .embed_and_index(wallet_report("uploads/missing.jpg"))
        .await;
    assert!(!vectorized.has_image_embedding);
    assert_eq!(pipeline.vectors.len().await, 1);
}

#[tokio::test]
async fn malformed_embedding_is_rejected_with_no_point() {
    let pipeline = Pipeline::with_defaults();
    let injected = Event::ItemEmbedded(ItemEmbedded {
        item: wallet_report(""),
        embedding: vec![0.1; 384],
        has_image_embedding: false,
    });
    let err = pipeline.indexer.handle(injected).await.unwrap_err();
    assert!(matches!(err, HandlerError::Malformed(_)));
    assert!(!err.requeue(), "384-dim embedding must not requeue");
    assert!(pipeline.vectors.is_empty().await);
}

#[tokio::test]
async fn portal_transient_failures_publish_exactly_once() {
    // 503 twice, then success. Each transient error would be redelivered by
    // the broker; the third delivery lands exactly one resource and one
    // item.published.
    let portal = ScriptedPortal::new().script([Script::ServerError(503), Script::ServerError(503), Script::Ok]);
    let pipeline = Pipeline::new(portal, Some("1234"));
    let vectorized = pipeline.embed_and_index(wallet_report("")).await;

    let mut deliveries = 0;
    let published = loop {
        deliveries += 1;
        match pipeline
            .publisher
            .handle(Event::ItemVectorized(vectorized.clone()))
            .await
        {
            Ok(events) => break events,
            Err(err) => assert!(err.requeue(), "5xx must be transient"),
        }
    };
    assert_eq!(deliveries, 3);
    assert_eq!(published.len(), 1);
    match &published[0] {
        Event::ItemPublished(p) => {
            assert_eq!(p.dataset_id, "1234");
            assert_eq!(p.item_id, Uuid::parse_str(WALLET_ID).unwrap());
        }
        other => panic!("expected item.published, got {}", other.routing_key()),
    }
    assert_eq!(pipeline.portal.resource_count(), 1);
}

#[tokio::test]
async fn bulk_import_fans_out_and_every_item_lands() {
    let csv = "\
title,description,category
Portfel,Czarny skórzany,Portfele i torby
Klucze,Pęk z brelokiem,Klucze
Telefon,Smartfon w etui,Elektronika
Parasol,Niebieski automat,Inne
Okulary,Przeciwsłoneczne,Okulary
Rower,Składak,Rowery i hulajnogi
Kurtka,Zimowa granatowa,Odzież
Zegarek,Srebrny na pasku,Biżuteria i zegarki
";
    let converter = LegacyConverter::new();
    let submitted = converter
        .handle(Event::DatasetSubmitted(DatasetSubmitted {
            dataset_id: "ds-1".into(),
            file_data: B64.encode(csv),
            file_name: "zguby.csv".into(),
            file_format: "csv".into(),
        }))
        .await
        .unwrap();
    assert_eq!(submitted.len(), 8);

    let pipeline = Pipeline::with_defaults();
    let mut vector_ids = Vec::new();
    for event in submitted {
        let Event::ItemSubmitted(item) = event else {
            panic!("converter must emit item.submitted only");
        };
        let vectorized = pipeline.embed_and_index(item).await;
        vector_ids.push(vectorized.vector_id);
    }

    vector_ids.sort();
    vector_ids.dedup();
    assert_eq!(vector_ids.len(), 8, "eight distinct items in the collection");
    assert_eq!(pipeline.vectors.len().await, 8);
}

// ─── Idempotency and flag invariants ─────────────────────────────────────────

#[tokio::test]
async fn resubmission_is_an_upsert_not_a_duplicate() {
    let pipeline = Pipeline::with_defaults();
    pipeline.embed_and_index(wallet_report("")).await;

    let mut updated = wallet_report("");
    updated.description = "Czarny skórzany, znaleziony w hali".into();
    pipeline.embed_and_index(updated).await;

    assert_eq!(pipeline.vectors.len().await, 1, "same item_id, one point");
    let point = pipeline
        .vectors
        .get(Uuid::parse_str(WALLET_ID).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(point.payload.description.contains("hali"), "payload replaced");
}

#[tokio::test]
async fn flags_are_monotone_under_redelivery() {
    let pipeline = Pipeline::with_defaults();
    pipeline.items.insert(wallet_report("")).await.unwrap();

    let id = Uuid::parse_str(WALLET_ID).unwrap();
    for _ in 0..3 {
        pipeline.embed_and_index(wallet_report("")).await;
        let record = pipeline.items.get(id).await.unwrap().unwrap();
        assert!(record.embedded && record.vectorized);
        assert_eq!(record.status, ItemStatus::PublishedInPipeline);
    }
}

// ─── Search semantics ────────────────────────────────────────────────────────

#[tokio::test]
async fn searching_known_text_ranks_it_first() {
    let pipeline = Pipeline::with_defaults();
    for i in 0..100u128 {
        let item = report(i + 1, &format!("Przedmiot numer {i}"), Category::Inne);
        pipeline.embed_and_index(item).await;
    }
    let needle = report(42, "Przedmiot numer 41", Category::Inne);

    // Re-embed the needle's exact text to build the query vector.
    let embedded = pipeline
        .embedder
        .handle(Event::ItemSubmitted(needle))
        .await
        .unwrap()
        .pop()
        .unwrap();
    let Event::ItemEmbedded(embedded) = embedded else { unreachable!() };

    let hits = pipeline
        .vectors
        .search(&embedded.embedding, &SearchParams::default())
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].id, Uuid::from_u128(42));
    assert!(hits[0].score >= 0.99, "identical text scores as identical");
    assert!(hits[0].score >= 0.75);
    for hit in &hits[1..] {
        assert!(hit.score <= hits[0].score);
    }
}

#[tokio::test]
async fn category_filter_returns_only_that_category() {
    let pipeline = Pipeline::with_defaults();
    pipeline
        .embed_and_index(report(1, "Pęk kluczy z brelokiem", Category::Klucze))
        .await;
    pipeline
        .embed_and_index(report(2, "Pęk kluczy rowerowych", Category::Klucze))
        .await;
    pipeline
        .embed_and_index(report(3, "Czarny portfel", Category::PortfeleITorby))
        .await;

    let query = pipeline
        .embedder
        .handle(Event::ItemSubmitted(report(9, "Pęk kluczy z brelokiem", Category::Klucze)))
        .await
        .unwrap()
        .pop()
        .unwrap();
    let Event::ItemEmbedded(query) = query else { unreachable!() };

    let params = SearchParams {
        score_threshold: 0.0,
        filter: SearchFilter {
            category: Some("Klucze".into()),
            location: None,
        },
        ..Default::default()
    };
    let hits = pipeline.vectors.search(&query.embedding, &params).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.payload.category == "Klucze"));
}
