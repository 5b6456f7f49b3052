use crate::config::JobConfig;
use crate::error::JobError;
use crate::protocol::{self, CoordinatorCommand, WorkerCommand, COORDINATOR, TAG};
use crate::transport::{Rank, Source, Transport};
use std::path::PathBuf;
use tokio::task;
use tracing::{debug, error, info, warn};
use wordindex_core::mapper::map_document;
use wordindex_core::persist::ShardPaths;
use wordindex_core::reducer::reduce_key;
use wordindex_core::IndexKey;

/// Units of work one worker completed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub documents: usize,
    pub keys: usize,
}

pub struct Worker<T: Transport> {
    transport: T,
    files_dir: PathBuf,
    paths: ShardPaths,
    report: WorkerReport,
}

impl<T: Transport> Worker<T> {
    pub fn new(transport: T, config: &JobConfig) -> Self {
        Self {
            transport,
            files_dir: config.files_dir.clone(),
            paths: config.shard_paths(),
            report: WorkerReport::default(),
        }
    }

    pub fn rank(&self) -> Rank { self.transport.rank() }

    /// A failed send is not fatal: a coordinator that already finished has
    /// queued an exit for us, and the next receive picks it up.
    async fn request(&self, command: CoordinatorCommand) {
        if let Err(e) = protocol::send(&self.transport, COORDINATOR, &command).await {
            warn!(%command, error = %e, "could not reach the coordinator");
        }
    }

    /// Request work until the coordinator says to exit. Each completion is
    /// acknowledged and immediately followed by the next request.
    pub async fn run(mut self) -> Result<WorkerReport, JobError> {
        let rank = self.rank();
        self.request(CoordinatorCommand::RequestMap(rank)).await;

        loop {
            let envelope = self.transport.recv(Source::Rank(COORDINATOR), TAG).await?;
            let command: WorkerCommand = match envelope.payload.parse() {
                Ok(command) => command,
                Err(e) => return self.abort(JobError::from(e)).await,
            };
            debug!(%command, "received");

            match command {
                WorkerCommand::Exit => {
                    info!(documents = self.report.documents, keys = self.report.keys, "exiting");
                    return Ok(self.report);
                }
                WorkerCommand::Map(document) => {
                    if let Err(e) = self.map(document).await {
                        return self.abort(e).await;
                    }
                    self.report.documents += 1;
                    self.request(CoordinatorCommand::MapDone).await;
                    self.request(CoordinatorCommand::RequestMap(rank)).await;
                }
                WorkerCommand::BeginReduce => {
                    self.request(CoordinatorCommand::RequestReduce(rank)).await;
                }
                WorkerCommand::Reduce(key) => {
                    if let Err(e) = self.reduce(key).await {
                        return self.abort(e).await;
                    }
                    self.report.keys += 1;
                    self.request(CoordinatorCommand::ReduceDone).await;
                    self.request(CoordinatorCommand::RequestReduce(rank)).await;
                }
            }
        }
    }

    async fn map(&self, document: String) -> Result<(), JobError> {
        let files_dir = self.files_dir.clone();
        let paths = self.paths.clone();
        let terms = task::spawn_blocking(move || map_document(&files_dir, &paths, &document))
            .await
            .map_err(|e| JobError::Task(e.to_string()))??;
        debug!(terms = terms.len(), "map task done");
        Ok(())
    }

    async fn reduce(&self, key: IndexKey) -> Result<(), JobError> {
        let paths = self.paths.clone();
        let index = task::spawn_blocking(move || reduce_key(&paths, key))
            .await
            .map_err(|e| JobError::Task(e.to_string()))??;
        debug!(%key, terms = index.len(), "reduce task done");
        Ok(())
    }

    /// Tell the coordinator to stop the job and leave without waiting.
    async fn abort(&mut self, cause: JobError) -> Result<WorkerReport, JobError> {
        error!(error = %cause, "aborting");
        self.request(CoordinatorCommand::Abort).await;
        Err(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;
    use std::fs;
    use tempfile::tempdir;

    async fn expect(coordinator: &mut LocalTransport, command: CoordinatorCommand) {
        let envelope = coordinator.recv(Source::Any, TAG).await.unwrap();
        assert_eq!(envelope.source, 1);
        assert_eq!(envelope.payload.parse::<CoordinatorCommand>().unwrap(), command);
    }

    async fn tell(coordinator: &LocalTransport, command: WorkerCommand) {
        protocol::send(coordinator, 1, &command).await.unwrap();
    }

    #[tokio::test]
    async fn pipelines_ack_and_next_request() {
        let dir = tempdir().unwrap();
        let files = dir.path().join("files");
        fs::create_dir_all(&files).unwrap();
        fs::write(files.join("a.txt"), "dog dog cat").unwrap();
        let config = JobConfig::new(&files, dir.path().join("index")).with_temp_dir(dir.path().join("map"));

        let mut group = LocalTransport::group(2);
        let worker = Worker::new(group.pop().unwrap(), &config);
        let mut coordinator = group.pop().unwrap();
        let handle = tokio::spawn(worker.run());

        expect(&mut coordinator, CoordinatorCommand::RequestMap(1)).await;
        tell(&coordinator, WorkerCommand::Map("a.txt".into())).await;
        expect(&mut coordinator, CoordinatorCommand::MapDone).await;
        expect(&mut coordinator, CoordinatorCommand::RequestMap(1)).await;

        tell(&coordinator, WorkerCommand::BeginReduce).await;
        expect(&mut coordinator, CoordinatorCommand::RequestReduce(1)).await;
        tell(&coordinator, WorkerCommand::Reduce("d".parse().unwrap())).await;
        expect(&mut coordinator, CoordinatorCommand::ReduceDone).await;
        expect(&mut coordinator, CoordinatorCommand::RequestReduce(1)).await;

        tell(&coordinator, WorkerCommand::Exit).await;
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report, WorkerReport { documents: 1, keys: 1 });
        assert!(dir.path().join("index/d.idx").is_file());
    }

    #[tokio::test]
    async fn missing_shards_make_the_worker_abort() {
        let dir = tempdir().unwrap();
        let config = JobConfig::new(dir.path(), dir.path().join("index")).with_temp_dir(dir.path().join("map"));

        let mut group = LocalTransport::group(2);
        let worker = Worker::new(group.pop().unwrap(), &config);
        let mut coordinator = group.pop().unwrap();
        let handle = tokio::spawn(worker.run());

        expect(&mut coordinator, CoordinatorCommand::RequestMap(1)).await;
        tell(&coordinator, WorkerCommand::BeginReduce).await;
        expect(&mut coordinator, CoordinatorCommand::RequestReduce(1)).await;
        tell(&coordinator, WorkerCommand::Reduce("a".parse().unwrap())).await;
        expect(&mut coordinator, CoordinatorCommand::Abort).await;

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, JobError::Index(wordindex_core::IndexError::MissingShards(_))));
        assert!(!dir.path().join("index").exists());
    }

    #[tokio::test]
    async fn exit_is_honoured_while_waiting_for_work() {
        let dir = tempdir().unwrap();
        let config = JobConfig::new(dir.path(), dir.path().join("index"));

        let mut group = LocalTransport::group(2);
        let worker = Worker::new(group.pop().unwrap(), &config);
        let mut coordinator = group.pop().unwrap();
        let handle = tokio::spawn(worker.run());

        expect(&mut coordinator, CoordinatorCommand::RequestMap(1)).await;
        tell(&coordinator, WorkerCommand::Exit).await;
        assert_eq!(handle.await.unwrap().unwrap(), WorkerReport::default());
    }

    #[tokio::test]
    async fn unreadable_document_aborts() {
        let dir = tempdir().unwrap();
        let config = JobConfig::new(dir.path(), dir.path().join("index")).with_temp_dir(dir.path().join("map"));

        let mut group = LocalTransport::group(2);
        let worker = Worker::new(group.pop().unwrap(), &config);
        let mut coordinator = group.pop().unwrap();
        let handle = tokio::spawn(worker.run());

        expect(&mut coordinator, CoordinatorCommand::RequestMap(1)).await;
        tell(&coordinator, WorkerCommand::Map("ghost.txt".into())).await;
        expect(&mut coordinator, CoordinatorCommand::Abort).await;
        assert!(handle.await.unwrap().is_err());
    }
}
