use crate::protocol::ProtocolError;
use crate::transport::{Rank, TransportError};
use std::path::PathBuf;
use thiserror::Error;
use wordindex_core::IndexError;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The input directory does not exist; nothing was started
    #[error("missing the '{}' directory", .0.display())]
    MissingInput(PathBuf),

    /// A worker reported a fatal error and the whole group was stopped
    #[error("job aborted by rank {rank}")]
    Aborted { rank: Rank },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("task failed: {0}")]
    Task(String),
}
