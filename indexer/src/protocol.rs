//! Textual command vocabulary exchanged between the coordinator and workers.
//!
//! Each message is a single line: a verb, optionally followed by one space and
//! an argument. Document names may themselves contain spaces, so the argument
//! is everything after the first space.

use crate::transport::{Rank, Tag, Transport, TransportError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use wordindex_core::IndexKey;

/// Tag carried by every protocol message.
pub const TAG: Tag = 55;

/// Rank of the coordinator inside the group.
pub const COORDINATOR: Rank = 0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("malformed argument in '{0}'")]
    BadArgument(String),
}

/// Messages a worker sends to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCommand {
    RequestMap(Rank),
    MapDone,
    RequestReduce(Rank),
    ReduceDone,
    Abort,
}

/// Messages the coordinator sends to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    Map(String),
    BeginReduce,
    Reduce(IndexKey),
    Exit,
}

fn split(line: &str) -> (&str, Option<&str>) {
    match line.split_once(' ') {
        Some((verb, arg)) => (verb, Some(arg)),
        None => (line, None),
    }
}

impl fmt::Display for CoordinatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestMap(rank) => write!(f, "map {rank}"),
            Self::MapDone => f.write_str("end_map"),
            Self::RequestReduce(rank) => write!(f, "reduce {rank}"),
            Self::ReduceDone => f.write_str("end_reduce"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

impl FromStr for CoordinatorCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rank = |arg: Option<&str>| {
            arg.and_then(|a| a.parse::<Rank>().ok())
                .ok_or_else(|| ProtocolError::BadArgument(s.to_string()))
        };
        match split(s) {
            ("map", arg) => Ok(Self::RequestMap(rank(arg)?)),
            ("reduce", arg) => Ok(Self::RequestReduce(rank(arg)?)),
            ("end_map", None) => Ok(Self::MapDone),
            ("end_reduce", None) => Ok(Self::ReduceDone),
            ("abort", None) => Ok(Self::Abort),
            _ => Err(ProtocolError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(document) => write!(f, "map {document}"),
            Self::BeginReduce => f.write_str("request_reduce"),
            Self::Reduce(key) => write!(f, "reduce {key}"),
            Self::Exit => f.write_str("exit"),
        }
    }
}

impl FromStr for WorkerCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split(s) {
            ("map", Some(document)) if !document.is_empty() => Ok(Self::Map(document.to_string())),
            ("reduce", Some(key)) => key
                .parse()
                .map(Self::Reduce)
                .map_err(|_| ProtocolError::BadArgument(s.to_string())),
            ("request_reduce", None) => Ok(Self::BeginReduce),
            ("exit", None) => Ok(Self::Exit),
            ("map", _) => Err(ProtocolError::BadArgument(s.to_string())),
            _ => Err(ProtocolError::Unknown(s.to_string())),
        }
    }
}

/// Encode `command` and send it to `dest` under [`TAG`].
pub async fn send<T, C>(transport: &T, dest: Rank, command: &C) -> Result<(), TransportError>
where
    T: Transport + ?Sized,
    C: fmt::Display,
{
    transport.send(dest, TAG, command.to_string()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_requests_carry_rank() {
        assert_eq!("map 3".parse(), Ok(CoordinatorCommand::RequestMap(3)));
        assert_eq!("reduce 12".parse(), Ok(CoordinatorCommand::RequestReduce(12)));
        assert_eq!(CoordinatorCommand::RequestMap(4).to_string(), "map 4");
        assert_eq!(CoordinatorCommand::MapDone.to_string(), "end_map");
    }

    #[test]
    fn request_without_numeric_rank_is_rejected() {
        assert!(matches!("map x".parse::<CoordinatorCommand>(), Err(ProtocolError::BadArgument(_))));
        assert!(matches!("map".parse::<CoordinatorCommand>(), Err(ProtocolError::BadArgument(_))));
        assert!(matches!("end_map 1".parse::<CoordinatorCommand>(), Err(ProtocolError::Unknown(_))));
        assert!(matches!("hello".parse::<CoordinatorCommand>(), Err(ProtocolError::Unknown(_))));
    }

    #[test]
    fn document_names_keep_their_spaces() {
        let cmd: WorkerCommand = "map my notes.txt".parse().unwrap();
        assert_eq!(cmd, WorkerCommand::Map("my notes.txt".to_string()));
        assert_eq!(cmd.to_string(), "map my notes.txt");
    }

    #[test]
    fn reduce_assignment_needs_a_valid_key() {
        assert_eq!("reduce q".parse(), Ok(WorkerCommand::Reduce("q".parse().unwrap())));
        assert!(matches!("reduce Q".parse::<WorkerCommand>(), Err(ProtocolError::BadArgument(_))));
        assert_eq!("request_reduce".parse(), Ok(WorkerCommand::BeginReduce));
        assert_eq!("exit".parse(), Ok(WorkerCommand::Exit));
    }
}
