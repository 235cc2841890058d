//! Domain types shared by the chunker, embedders and the vector store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ChunkId = String;
pub type Metadata = HashMap<String, serde_json::Value>;

/// A unit of text plus an arbitrary metadata mapping.
///
/// Source documents and the chunks split from them share this shape; a chunk
/// carries a copy of its source document's metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self { page_content: page_content.into(), metadata: Metadata::new() }
    }

    pub fn with_metadata(page_content: impl Into<String>, metadata: Metadata) -> Self {
        Self { page_content: page_content.into(), metadata }
    }

    /// Builder-style helper for attaching a single metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A document returned from similarity search.
///
/// `score` is `1 - cosine distance`; higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: ChunkId,
    pub document: Document,
    pub score: f32,
}
