//! Vector-store factory on top of LanceDB.
//!
//! A collection is one LanceDB table under the persist directory. Documents
//! are embedded on write with the store's [`Embedder`]; search embeds the
//! query the same way and ranks by cosine distance. The table is created on
//! the first write, so opening a store never touches disk beyond creating
//! the directory.

#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod schema;
pub mod table;

use anyhow::{Context, Result};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rag_core::paths::ensure_dir;
use rag_core::traits::Embedder;
use rag_core::{Document, ScoredDocument, Settings};

use crate::schema::{batch_to_scored, documents_to_batch};
use crate::table::{append, check_dim, open_db, open_table_if_exists};

pub const DEFAULT_COLLECTION: &str = "agentic_rag";
/// Rows embedded and written per LanceDB append.
pub const WRITE_BATCH: usize = 1000;

/// A persistent collection of embedded documents.
pub struct VectorStore {
    db: Connection,
    embedder: Arc<dyn Embedder>,
    collection: String,
    dir: PathBuf,
}

/// Open (creating the directory if needed) the collection `collection_name`
/// under `persist_directory`, or under `settings.paths.vectorstore_dir`
/// (anchored at the settings root) when no directory is given.
pub async fn get_vectorstore(
    embedder: Arc<dyn Embedder>,
    collection_name: &str,
    persist_directory: Option<&Path>,
    settings: &Settings,
) -> Result<VectorStore> {
    let dir = persist_directory.map_or_else(|| settings.vectorstore_dir(), Path::to_path_buf);
    ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let db = open_db(&dir).await?;
    tracing::debug!(
        dir = %dir.display(),
        collection = collection_name,
        model = embedder.model_id(),
        "vector store ready"
    );
    Ok(VectorStore { db, embedder, collection: collection_name.to_string(), dir })
}

impl VectorStore {
    pub fn collection(&self) -> &str { &self.collection }
    pub fn dir(&self) -> &Path { &self.dir }
    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// Embed and store `docs`, returning one generated id per document in
    /// input order.
    pub async fn add_documents(&self, docs: &[Document]) -> Result<Vec<String>> {
        let dim = self.embedder.dim();
        if let Some(table) = open_table_if_exists(&self.db, &self.collection).await? {
            check_dim(&table, dim).await?;
        }
        let mut ids = Vec::with_capacity(docs.len());
        for batch in docs.chunks(WRITE_BATCH) {
            let texts: Vec<String> = batch.iter().map(|d| d.page_content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            let batch_ids: Vec<String> = batch.iter().map(|_| uuid::Uuid::new_v4().to_string()).collect();
            let record_batch = documents_to_batch(&batch_ids, batch, &vectors, dim)?;
            append(&self.db, &self.collection, record_batch).await?;
            ids.extend(batch_ids);
        }
        tracing::debug!(collection = %self.collection, added = ids.len(), "documents added");
        Ok(ids)
    }

    /// Up to `k` documents nearest to `query`, best first, with
    /// `1 - cosine distance` as the score.
    pub async fn similarity_search_with_score(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        if k == 0 {
            return Ok(vec![]);
        }
        let Some(table) = open_table_if_exists(&self.db, &self.collection).await? else {
            return Ok(vec![]);
        };
        let vector = self.embedder.embed_query(query)?;
        let mut stream = table.vector_search(vector)?.distance_type(DistanceType::Cosine).limit(k).execute().await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            hits.extend(batch_to_scored(&batch)?);
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        Ok(self.similarity_search_with_score(query, k).await?.into_iter().map(|hit| hit.document).collect())
    }

    /// Number of stored documents; 0 before the first write.
    pub async fn count(&self) -> Result<usize> {
        match open_table_if_exists(&self.db, &self.collection).await? {
            Some(table) => Ok(table.count_rows(None).await?),
            None => Ok(0),
        }
    }

    pub fn as_retriever(self, k: usize) -> Retriever { Retriever { store: self, k } }
}

/// Fixed-`k` similarity search over a [`VectorStore`].
pub struct Retriever {
    store: VectorStore,
    k: usize,
}

impl Retriever {
    pub fn k(&self) -> usize { self.k }
    pub fn store(&self) -> &VectorStore { &self.store }

    /// The `k` documents nearest to `query`, best first.
    pub async fn invoke(&self, query: &str) -> Result<Vec<Document>> {
        self.store.similarity_search(query, self.k).await
    }
}

/// Build a store as [`get_vectorstore`] does and wrap it in a retriever
/// returning `top_k` documents, `settings.rag.top_k` when `None` or 0.
pub async fn get_retriever(
    embedder: Arc<dyn Embedder>,
    top_k: Option<usize>,
    collection_name: &str,
    persist_directory: Option<&Path>,
    settings: &Settings,
) -> Result<Retriever> {
    let store = get_vectorstore(embedder, collection_name, persist_directory, settings).await?;
    Ok(store.as_retriever(top_k.filter(|k| *k > 0).unwrap_or(settings.rag.top_k)))
}
