//! Settings, logging, chunking and shared types for the agentic RAG skeleton.
//!
//! Everything here is synchronous glue; the embedding and vector-store
//! factories live in `rag-embed` and `rag-vector`.

#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunking;
pub mod error;
pub mod loader;
pub mod logging;
pub mod paths;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use settings::{Settings, SettingsLoader};
pub use types::{Document, Metadata, ScoredDocument};
