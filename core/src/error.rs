//! Errors raised by the map and reduce stages.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Reading or writing a document or shard failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A shard file did not hold the expected JSON mapping
    #[error("malformed shard {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The temp directory is absent or holds no map shards
    #[error("no files to reduce in {}", .0.display())]
    MissingShards(PathBuf),

    #[error("'{0}' is not an index key")]
    UnknownKey(String),
}

impl IndexError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json { path: path.to_path_buf(), source }
    }
}
