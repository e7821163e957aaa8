//! Error types shared across the crate

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a score/config file failed
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Configuration file exists but is not valid JSON for `Settings`
    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The background worker thread could not be started
    #[error("failed to spawn job worker: {0}")]
    WorkerSpawn(#[source] io::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
