use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid settings: {0}")]
    Settings(#[from] Box<figment::Error>),

    #[error("Invalid chunking config: chunk_overlap ({chunk_overlap}) must be < chunk_size ({chunk_size})")]
    InvalidChunking { chunk_size: usize, chunk_overlap: usize },

    #[error("Invalid logging config at {}: {source}", path.display())]
    LoggingConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Logging is already installed for this process")]
    LoggingInstalled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self { Self::Settings(Box::new(e)) }
}

pub type Result<T> = std::result::Result<T, Error>;
