use crate::config::JobConfig;
use crate::coordinator::{run_coordinator, JobReport};
use crate::error::JobError;
use crate::protocol::COORDINATOR;
use crate::transport::LocalTransport;
use crate::worker::Worker;
use tracing::{info_span, warn, Instrument};

/// Run a whole job in this process: rank 0 coordinates, every other rank is a
/// worker task. Returns the coordinator's outcome once every rank has exited.
pub async fn run_job(config: JobConfig) -> Result<JobReport, JobError> {
    config.validate()?;

    let mut endpoints = LocalTransport::group(config.group_size()).into_iter();
    let coordinator = endpoints
        .next()
        .ok_or_else(|| JobError::Config("empty process group".into()))?;

    let mut workers = Vec::with_capacity(config.workers);
    for endpoint in endpoints {
        let worker = Worker::new(endpoint, &config);
        let rank = worker.rank();
        let handle = tokio::spawn(worker.run().instrument(info_span!("rank", rank)));
        workers.push((rank, handle));
    }

    let outcome = run_coordinator(coordinator, &config)
        .instrument(info_span!("rank", rank = COORDINATOR))
        .await;

    for (rank, handle) in workers {
        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(rank, error = %e, "worker stopped with an error"),
            Err(e) => warn!(rank, error = %e, "worker task failed"),
        }
    }
    outcome
}
