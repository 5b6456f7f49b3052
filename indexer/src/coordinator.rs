//! Rank 0: owns both work queues and the phase counters.
//!
//! The coordinator is purely reactive. It receives one command at a time, from
//! any worker, and answers with at most one addressed reply (plus broadcasts on
//! phase changes). Being the only mutator of the queues, it needs no locks.

use crate::config::JobConfig;
use crate::error::JobError;
use crate::protocol::{self, CoordinatorCommand, WorkerCommand, COORDINATOR, TAG};
use crate::transport::{Rank, Source, Transport};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;
use wordindex_core::persist::{remove_dir_if_exists, ShardPaths};
use wordindex_core::{IndexError, IndexKey};

/// FIFO pool of unassigned work items.
#[derive(Debug, Clone)]
pub struct WorkQueue<T> {
    items: VecDeque<T>,
}

impl<T> WorkQueue<T> {
    pub fn pop(&mut self) -> Option<T> { self.items.pop_front() }
    fn len(&self) -> usize { self.items.len() }
}

impl<T> FromIterator<T> for WorkQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

/// Countdown of outstanding completions for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCounter {
    remaining: usize,
}

impl PhaseCounter {
    pub fn new(total: usize) -> Self { Self { remaining: total } }
    pub fn remaining(&self) -> usize { self.remaining }
    pub fn is_zero(&self) -> bool { self.remaining == 0 }

    /// Record one completion; true when this one finished the phase.
    pub fn complete(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
    Done,
    Aborted { by: Rank },
}

/// Side effects requested by the state machine, applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send(Rank, WorkerCommand),
    RemoveShards,
}

/// Totals of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    pub documents: usize,
    pub keys: usize,
}

pub struct Coordinator {
    phase: Phase,
    documents: WorkQueue<String>,
    keys: WorkQueue<IndexKey>,
    maps_pending: PhaseCounter,
    reduces_pending: PhaseCounter,
    workers: Vec<Rank>,
    report: JobReport,
}

impl Coordinator {
    pub fn new<W: IntoIterator<Item = Rank>>(documents: Vec<String>, workers: W) -> Self {
        let documents: WorkQueue<String> = documents.into_iter().collect();
        let keys: WorkQueue<IndexKey> = IndexKey::all().collect();
        let report = JobReport { documents: documents.len(), keys: keys.len() };
        Self {
            phase: Phase::Map,
            maps_pending: PhaseCounter::new(documents.len()),
            reduces_pending: PhaseCounter::new(keys.len()),
            documents,
            keys,
            workers: workers.into_iter().collect(),
            report,
        }
    }

    pub fn phase(&self) -> Phase { self.phase }
    pub fn report(&self) -> JobReport { self.report }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Aborted { .. })
    }

    /// Effects due before the first request; an empty corpus goes straight
    /// to the reduce phase.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Map && self.maps_pending.is_zero() {
            info!("no documents to map");
            return self.begin_reduce();
        }
        Vec::new()
    }

    pub fn handle(&mut self, source: Rank, command: CoordinatorCommand) -> Vec<Effect> {
        if self.is_finished() {
            warn!(source, %command, phase = ?self.phase, "ignoring command after the job ended");
            return Vec::new();
        }
        match command {
            CoordinatorCommand::Abort => {
                error!(source, "worker reported an error, stopping all workers");
                self.abort(source)
            }
            CoordinatorCommand::RequestMap(worker) => match self.documents.pop() {
                Some(document) => {
                    info!(worker, %document, "assigning document");
                    vec![Effect::Send(worker, WorkerCommand::Map(document))]
                }
                None => {
                    debug!(worker, "no documents left");
                    Vec::new()
                }
            },
            CoordinatorCommand::MapDone => {
                if self.phase != Phase::Map {
                    warn!(source, "map completion outside the map phase");
                    return Vec::new();
                }
                if self.maps_pending.complete() {
                    return self.begin_reduce();
                }
                debug!(remaining = self.maps_pending.remaining(), "document mapped");
                Vec::new()
            }
            CoordinatorCommand::RequestReduce(worker) => {
                if self.phase != Phase::Reduce {
                    warn!(worker, "reduce request before the reduce phase");
                    return Vec::new();
                }
                match self.keys.pop() {
                    Some(key) => {
                        info!(worker, %key, "assigning key");
                        vec![Effect::Send(worker, WorkerCommand::Reduce(key))]
                    }
                    None => {
                        debug!(worker, "no keys left");
                        Vec::new()
                    }
                }
            }
            CoordinatorCommand::ReduceDone => {
                if self.phase != Phase::Reduce {
                    warn!(source, "reduce completion outside the reduce phase");
                    return Vec::new();
                }
                if !self.reduces_pending.complete() {
                    debug!(remaining = self.reduces_pending.remaining(), "key reduced");
                    return Vec::new();
                }
                info!("all keys reduced, job finished");
                self.phase = Phase::Done;
                let mut effects = vec![Effect::RemoveShards];
                effects.extend(self.broadcast(WorkerCommand::Exit));
                effects
            }
        }
    }

    /// Stop everyone. `by` is the rank whose failure caused it.
    pub fn abort(&mut self, by: Rank) -> Vec<Effect> {
        self.phase = Phase::Aborted { by };
        self.broadcast(WorkerCommand::Exit)
    }

    fn begin_reduce(&mut self) -> Vec<Effect> {
        info!("all documents mapped, starting reduce phase");
        self.phase = Phase::Reduce;
        self.broadcast(WorkerCommand::BeginReduce)
    }

    fn broadcast(&self, command: WorkerCommand) -> Vec<Effect> {
        self.workers.iter().map(|&w| Effect::Send(w, command.clone())).collect()
    }
}

/// Regular files directly inside `dir`, by name.
fn list_documents(dir: &Path) -> Result<Vec<String>, JobError> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| IndexError::io(dir, e.into()))?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => documents.push(name.to_string()),
            None => warn!(path = %entry.path().display(), "skipping document with non UTF-8 name"),
        }
    }
    Ok(documents)
}

fn prepare(config: &JobConfig, paths: &ShardPaths) -> Result<Vec<String>, JobError> {
    if !config.files_dir.is_dir() {
        return Err(JobError::MissingInput(config.files_dir.clone()));
    }
    // Leftovers from an earlier run would otherwise leak into this index.
    if remove_dir_if_exists(&paths.index)? {
        debug!(dir = %paths.index.display(), "removed stale index");
    }
    if remove_dir_if_exists(&paths.temp)? {
        debug!(dir = %paths.temp.display(), "removed stale map shards");
    }
    list_documents(&config.files_dir)
}

async fn apply<T: Transport>(transport: &T, paths: &ShardPaths, effects: Vec<Effect>) -> Result<(), JobError> {
    for effect in effects {
        match effect {
            Effect::Send(dest, WorkerCommand::Exit) => {
                if let Err(e) = protocol::send(transport, dest, &WorkerCommand::Exit).await {
                    warn!(dest, error = %e, "could not deliver exit");
                }
            }
            Effect::Send(dest, command) => protocol::send(transport, dest, &command).await?,
            Effect::RemoveShards => match remove_dir_if_exists(&paths.temp) {
                Ok(_) => debug!(dir = %paths.temp.display(), "removed map shards"),
                Err(e) => warn!(error = %e, "could not remove map shards"),
            },
        }
    }
    Ok(())
}

async fn drive<T: Transport>(
    transport: &mut T,
    paths: &ShardPaths,
    coordinator: &mut Coordinator,
) -> Result<(), JobError> {
    let effects = coordinator.start();
    apply(transport, paths, effects).await?;
    while !coordinator.is_finished() {
        let envelope = transport.recv(Source::Any, TAG).await?;
        let command: CoordinatorCommand = match envelope.payload.parse() {
            Ok(command) => command,
            Err(e) => {
                warn!(source = envelope.source, error = %e, "dropping message");
                continue;
            }
        };
        debug!(source = envelope.source, %command, "received");
        let effects = coordinator.handle(envelope.source, command);
        apply(transport, paths, effects).await?;
    }
    Ok(())
}

/// Run the coordinator loop until the job completes or aborts.
pub async fn run_coordinator<T: Transport>(mut transport: T, config: &JobConfig) -> Result<JobReport, JobError> {
    let paths = config.shard_paths();
    let workers: Vec<Rank> = (0..transport.size()).filter(|&r| r != COORDINATOR).collect();

    let documents = match prepare(config, &paths) {
        Ok(documents) => documents,
        Err(e) => {
            error!(error = %e, "cannot start, exiting");
            let mut coordinator = Coordinator::new(Vec::new(), workers);
            let effects = coordinator.abort(COORDINATOR);
            apply(&transport, &paths, effects).await?;
            return Err(e);
        }
    };

    let mut coordinator = Coordinator::new(documents, workers);
    let report = coordinator.report();
    info!(documents = report.documents, keys = report.keys, workers = transport.size() - 1, "starting map phase");

    if let Err(e) = drive(&mut transport, &paths, &mut coordinator).await {
        if !coordinator.is_finished() {
            error!(error = %e, "coordinator failed, stopping all workers");
            let effects = coordinator.abort(COORDINATOR);
            apply(&transport, &paths, effects).await?;
        }
        return Err(e);
    }

    match coordinator.phase() {
        Phase::Aborted { by } => Err(JobError::Aborted { rank: by }),
        _ => Ok(report),
    }
}
