use async_trait::async_trait;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Position of a process inside the group. Rank 0 is the coordinator.
pub type Rank = usize;
pub type Tag = u32;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("rank {dest} is outside a group of {size}")]
    NoSuchRank { dest: Rank, size: usize },
    #[error("rank {0} is no longer receiving")]
    Disconnected(Rank),
    #[error("every peer of rank {0} has hung up")]
    Closed(Rank),
}

/// Which senders a receive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Any,
    Rank(Rank),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: Rank,
    pub tag: Tag,
    pub payload: String,
}

impl Envelope {
    fn matches(&self, source: Source, tag: Tag) -> bool {
        self.tag == tag
            && match source {
                Source::Any => true,
                Source::Rank(r) => self.source == r,
            }
    }
}

/// Reliable point-to-point messaging inside a fixed-size group, FIFO per
/// sender/receiver pair.
#[async_trait]
pub trait Transport: Send + Sync {
    fn rank(&self) -> Rank;
    fn size(&self) -> usize;

    async fn send(&self, dest: Rank, tag: Tag, payload: String) -> Result<(), TransportError>;

    /// Block until an envelope from `source` with `tag` arrives. Envelopes that
    /// do not match stay queued, in arrival order, for later receives.
    async fn recv(&mut self, source: Source, tag: Tag) -> Result<Envelope, TransportError>;
}

/// In-process endpoint; one inbox per rank, fed by every other endpoint.
pub struct LocalTransport {
    rank: Rank,
    peers: Vec<Option<UnboundedSender<Envelope>>>,
    inbox: UnboundedReceiver<Envelope>,
    pending: VecDeque<Envelope>,
}

impl LocalTransport {
    /// Build a fully connected group of `size` endpoints, indexed by rank.
    pub fn group(size: usize) -> Vec<LocalTransport> {
        let (senders, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::unbounded_channel()).unzip();
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalTransport {
                rank,
                // No sender to self, so an endpoint whose peers are all gone
                // observes a closed inbox instead of waiting forever.
                peers: senders
                    .iter()
                    .enumerate()
                    .map(|(r, tx)| (r != rank).then(|| tx.clone()))
                    .collect(),
                inbox,
                pending: VecDeque::new(),
            })
            .collect()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn rank(&self) -> Rank { self.rank }

    fn size(&self) -> usize { self.peers.len() }

    async fn send(&self, dest: Rank, tag: Tag, payload: String) -> Result<(), TransportError> {
        let peer = self
            .peers
            .get(dest)
            .ok_or(TransportError::NoSuchRank { dest, size: self.peers.len() })?
            .as_ref()
            .ok_or(TransportError::NoSuchRank { dest, size: self.peers.len() })?;
        tracing::trace!(from = self.rank, to = dest, tag, %payload, "send");
        peer.send(Envelope { source: self.rank, tag, payload })
            .map_err(|_| TransportError::Disconnected(dest))
    }

    async fn recv(&mut self, source: Source, tag: Tag) -> Result<Envelope, TransportError> {
        if let Some(pos) = self.pending.iter().position(|e| e.matches(source, tag)) {
            if let Some(envelope) = self.pending.remove(pos) {
                return Ok(envelope);
            }
        }
        loop {
            match self.inbox.recv().await {
                Some(envelope) if envelope.matches(source, tag) => return Ok(envelope),
                Some(envelope) => self.pending.push_back(envelope),
                None => return Err(TransportError::Closed(self.rank)),
            }
        }
    }
}
