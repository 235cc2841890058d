//! Embedding factory.
//!
//! [`get_embeddings`] turns an [`EmbeddingConfig`] into a boxed
//! [`Embedder`]: a candle BERT sentence encoder by default, or the
//! deterministic [`HashEmbedder`] for tests and offline runs.

#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod bert;
pub mod device;
pub mod hash;
pub mod pool;
pub mod tokenize;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use rag_core::paths::expand_path;
pub use rag_core::traits::Embedder;

pub use bert::BertEmbedder;
pub use device::{select_device, DeviceSpec};
pub use hash::{HashEmbedder, HASH_DIM};
pub use pool::{l2_normalize, masked_mean};

pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// `model_name` that selects the [`HashEmbedder`].
pub const HASH_MODEL: &str = "hash";
/// Set to `1` or `true` to force the [`HashEmbedder`] whatever the config says.
pub const FAKE_EMBEDDINGS_ENV: &str = "RAG_USE_FAKE_EMBEDDINGS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// HuggingFace repo id or a local model directory.
    pub model_name: String,
    /// `cpu`, `cuda[:N]`, `metal[:N]` or `auto`.
    pub device: String,
    pub normalize_embeddings: bool,
    /// Hub cache directory; the hub default when unset.
    pub cache_folder: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            device: "cpu".to_string(),
            normalize_embeddings: true,
            cache_folder: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn hash() -> Self { Self { model_name: HASH_MODEL.to_string(), ..Self::default() } }

    fn wants_hash(&self) -> bool {
        self.model_name == HASH_MODEL || fake_embeddings_forced()
    }
}

fn fake_embeddings_forced() -> bool {
    std::env::var(FAKE_EMBEDDINGS_ENV).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Build the embedder described by `cfg`.
pub fn get_embeddings(cfg: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    if cfg.wants_hash() {
        tracing::info!(dim = HASH_DIM, "using hash embeddings");
        return Ok(Box::new(HashEmbedder::new(HASH_DIM, cfg.normalize_embeddings)));
    }
    let cache_folder = cfg.cache_folder.as_ref().map(|p| expand_path(p.to_string_lossy()));
    let cfg = EmbeddingConfig { cache_folder, ..cfg.clone() };
    Ok(Box::new(BertEmbedder::load(&cfg)?))
}
