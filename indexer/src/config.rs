use crate::error::JobError;
use std::env;
use std::path::{Component, Path, PathBuf};
use std::thread;
use wordindex_core::persist::ShardPaths;

pub const DEFAULT_TEMP_DIR: &str = "map";

/// Everything one indexing job needs.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Directory of input documents
    pub files_dir: PathBuf,
    /// Output directory, one shard per index key
    pub index_dir: PathBuf,
    /// Scratch directory for per-document term shards
    pub temp_dir: PathBuf,
    pub workers: usize,
}

impl JobConfig {
    pub fn new<F: Into<PathBuf>, I: Into<PathBuf>>(files_dir: F, index_dir: I) -> Self {
        Self {
            files_dir: files_dir.into(),
            index_dir: index_dir.into(),
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            workers: default_workers(),
        }
    }

    pub fn with_temp_dir<P: Into<PathBuf>>(mut self, temp_dir: P) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.workers == 0 {
            return Err(JobError::Config("at least one worker is required".into()));
        }
        if resolve(&self.temp_dir) == resolve(&self.index_dir) {
            return Err(JobError::Config("temp and index directories must differ".into()));
        }
        // Both are wiped at startup, so neither may be or contain the input.
        let files = resolve(&self.files_dir);
        for (role, dir) in [("index", &self.index_dir), ("temp", &self.temp_dir)] {
            if files.starts_with(resolve(dir)) {
                return Err(JobError::Config(format!(
                    "{role} directory '{}' would remove the input directory '{}'",
                    dir.display(),
                    self.files_dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Group size including the coordinator.
    pub fn group_size(&self) -> usize { self.workers + 1 }

    pub fn shard_paths(&self) -> ShardPaths { ShardPaths::new(&self.temp_dir, &self.index_dir) }
}

/// Absolute form of `path` with `.` and `..` folded and the deepest existing
/// ancestor canonicalized, so relative, dotted and symlinked spellings of one
/// directory compare equal.
fn resolve(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };
    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut missing = Vec::new();
    let mut head = lexical.as_path();
    loop {
        if let Ok(real) = head.canonicalize() {
            return missing.iter().rev().fold(real, |acc: PathBuf, part| acc.join(part));
        }
        match (head.parent(), head.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                head = parent;
            }
            _ => return lexical.clone(),
        }
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
