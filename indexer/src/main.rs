use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use time::macros::format_description;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, EnvFilter};
use wordindex::config::{default_workers, DEFAULT_TEMP_DIR};
use wordindex::{run_job, JobConfig};

#[derive(Parser)]
#[command(name = "wordindex")]
#[command(about = "Build an inverted word index with a coordinator and a pool of workers", long_about = None)]
struct Cli {
    /// Directory holding the documents to index
    files_dir: PathBuf,
    /// Output directory, one shard per index key
    index_dir: PathBuf,
    /// Scratch directory for per-document term counts, removed on success
    #[arg(long, env = "WORDINDEX_TEMP_DIR", default_value = DEFAULT_TEMP_DIR)]
    temp_dir: PathBuf,
    /// Number of worker ranks (the coordinator is one more)
    #[arg(long, env = "WORDINDEX_WORKERS", default_value_t = default_workers())]
    workers: usize,
}

impl From<Cli> for JobConfig {
    fn from(cli: Cli) -> Self {
        JobConfig::new(cli.files_dir, cli.index_dir)
            .with_temp_dir(cli.temp_dir)
            .with_workers(cli.workers)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let timer = UtcTime::new(format_description!("[hour]:[minute]:[second].[subsecond digits:6]"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_timer(timer).init();
    let cli = Cli::parse();

    match run_job(cli.into()).await {
        Ok(report) => {
            tracing::info!(documents = report.documents, keys = report.keys, "index build complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "index build failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
