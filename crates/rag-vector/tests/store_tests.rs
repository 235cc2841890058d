use std::sync::Arc;

use rag_core::{Document, Settings};
use rag_embed::HashEmbedder;
use rag_vector::{get_retriever, get_vectorstore, DEFAULT_COLLECTION};

fn embedder() -> Arc<HashEmbedder> { Arc::new(HashEmbedder::default()) }

fn corpus() -> Vec<Document> {
    vec![
        Document::new("rainwater barrel overflow valve").meta("source", "water.md"),
        Document::new("sourdough starter feeding schedule").meta("source", "bread.md"),
        Document::new("solar panel battery wiring").meta("source", "power.md"),
        Document::new("rainwater gutter screens and barrel lids").meta("source", "water.md"),
        Document::new("seed potatoes planting depth").meta("source", "garden.md"),
    ]
}

#[tokio::test]
async fn missing_directory_is_created() {
    let tmp = tempfile::tempdir().expect("tmp");
    let dir = tmp.path().join("nested/vectorstore");
    let store = get_vectorstore(embedder(), DEFAULT_COLLECTION, Some(&dir), &Settings::default()).await.expect("store");
    assert!(dir.is_dir());
    assert_eq!(store.collection(), "agentic_rag");
    assert_eq!(store.count().await.expect("count"), 0);
    assert!(store.similarity_search("anything", 3).await.expect("search").is_empty());
}

#[tokio::test]
async fn added_documents_come_back_nearest_first() {
    let tmp = tempfile::tempdir().expect("tmp");
    let store = get_vectorstore(embedder(), "notes", Some(tmp.path()), &Settings::default()).await.expect("store");

    let ids = store.add_documents(&corpus()).await.expect("add");
    assert_eq!(ids.len(), 5);
    assert_eq!(store.count().await.expect("count"), 5);

    let hits = store.similarity_search_with_score("rainwater barrel", 2).await.expect("search");
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
    assert!(hits.iter().all(|h| h.document.metadata["source"] == "water.md"), "{hits:?}");
    assert!(ids.contains(&hits[0].id));

    let all = store.similarity_search("rainwater barrel", 50).await.expect("search");
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn writes_persist_across_reopen() {
    let tmp = tempfile::tempdir().expect("tmp");
    {
        let store = get_vectorstore(embedder(), "notes", Some(tmp.path()), &Settings::default()).await.expect("store");
        store.add_documents(&corpus()[..2]).await.expect("add");
    }
    let store = get_vectorstore(embedder(), "notes", Some(tmp.path()), &Settings::default()).await.expect("reopen");
    store.add_documents(&corpus()[2..]).await.expect("append");
    assert_eq!(store.count().await.expect("count"), 5);
}

#[tokio::test]
async fn mismatched_embedder_dimension_is_rejected() {
    let tmp = tempfile::tempdir().expect("tmp");
    let store = get_vectorstore(embedder(), "notes", Some(tmp.path()), &Settings::default()).await.expect("store");
    store.add_documents(&corpus()).await.expect("add");

    let narrow = get_vectorstore(Arc::new(HashEmbedder::new(8, true)), "notes", Some(tmp.path()), &Settings::default())
        .await
        .expect("store");
    assert!(narrow.add_documents(&corpus()).await.is_err());
}

#[tokio::test]
async fn retriever_defaults_to_configured_top_k() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut settings = Settings::default();
    settings.rag.top_k = 3;

    let retriever =
        get_retriever(embedder(), None, DEFAULT_COLLECTION, Some(tmp.path()), &settings).await.expect("retriever");
    assert_eq!(retriever.k(), 3);
    retriever.store().add_documents(&corpus()).await.expect("add");
    let docs = retriever.invoke("rainwater barrel").await.expect("invoke");
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].metadata["source"], "water.md");

    let explicit =
        get_retriever(embedder(), Some(1), DEFAULT_COLLECTION, Some(tmp.path()), &settings).await.expect("retriever");
    assert_eq!(explicit.invoke("solar battery").await.expect("invoke").len(), 1);
}

#[tokio::test]
async fn directory_defaults_to_settings() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut settings = Settings::default();
    settings.paths.vectorstore_dir = tmp.path().join("from-settings").to_string_lossy().to_string();

    let store = get_vectorstore(embedder(), DEFAULT_COLLECTION, None, &settings).await.expect("store");
    assert_eq!(store.dir(), tmp.path().join("from-settings"));
    assert!(store.dir().is_dir());
}

#[tokio::test]
async fn zero_k_falls_back_to_configured_top_k() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut settings = Settings::default();
    settings.rag.top_k = 2;

    let retriever =
        get_retriever(embedder(), Some(0), DEFAULT_COLLECTION, Some(tmp.path()), &settings).await.expect("retriever");
    assert_eq!(retriever.k(), 2);
    retriever.store().add_documents(&corpus()).await.expect("add");
    assert_eq!(retriever.invoke("rainwater").await.expect("invoke").len(), 2);
}

#[tokio::test]
async fn relative_directory_is_anchored_at_settings_root() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut settings = Settings::default();
    settings.root = tmp.path().join("project");
    settings.paths.vectorstore_dir = "store/lance".to_string();

    let store = get_vectorstore(embedder(), DEFAULT_COLLECTION, None, &settings).await.expect("store");
    assert_eq!(store.dir(), tmp.path().join("project/store/lance"));
    assert!(store.dir().is_dir());
}
