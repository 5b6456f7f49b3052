//! Distributed inverted word index: a coordinator hands documents, then index
//! keys, to workers that request them one at a time over point-to-point
//! messages.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod protocol;
pub mod transport;
pub mod worker;

pub use config::JobConfig;
pub use coordinator::JobReport;
pub use error::JobError;
pub use job::run_job;
