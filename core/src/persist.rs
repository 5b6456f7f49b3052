use crate::error::{IndexError, IndexResult};
use crate::{IndexKey, InvertedIndexShard, TermFrequencyShard};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

const TERM_SHARD_EXT: &str = ".tmp";
const INDEX_SHARD_EXT: &str = ".idx";

/// Locations of the intermediate (map) and final (index) shards.
#[derive(Debug, Clone)]
pub struct ShardPaths {
    pub temp: PathBuf,
    pub index: PathBuf,
}

impl ShardPaths {
    pub fn new<T: AsRef<Path>, I: AsRef<Path>>(temp: T, index: I) -> Self {
        Self { temp: temp.as_ref().to_path_buf(), index: index.as_ref().to_path_buf() }
    }
    pub fn term_shard(&self, document: &str) -> PathBuf { self.temp.join(format!("{document}{TERM_SHARD_EXT}")) }
    pub fn index_shard(&self, key: IndexKey) -> PathBuf { self.index.join(format!("{key}{INDEX_SHARD_EXT}")) }
}

fn write_file(path: &Path, bytes: &[u8]) -> IndexResult<()> {
    let mut f = File::create(path).map_err(|e| IndexError::io(path, e))?;
    f.write_all(bytes).map_err(|e| IndexError::io(path, e))?;
    Ok(())
}

fn ensure_dir(dir: &Path) -> IndexResult<()> {
    create_dir_all(dir).map_err(|e| IndexError::io(dir, e))
}

/// Write a document's term counts as compact JSON. Overwrites any earlier shard
/// for the same document.
pub fn save_term_shard(paths: &ShardPaths, document: &str, shard: &TermFrequencyShard) -> IndexResult<PathBuf> {
    ensure_dir(&paths.temp)?;
    let file = paths.term_shard(document);
    let bytes = serde_json::to_vec(shard).map_err(|e| IndexError::json(&file, e))?;
    write_file(&file, &bytes)?;
    Ok(file)
}

pub fn load_term_shard(path: &Path) -> IndexResult<TermFrequencyShard> {
    let f = File::open(path).map_err(|e| IndexError::io(path, e))?;
    serde_json::from_reader(BufReader::new(f)).map_err(|e| IndexError::json(path, e))
}

/// Every persisted term shard as `(document name, path)`, sorted by document.
///
/// A missing temp directory, or one without any shard, is reported as
/// [`IndexError::MissingShards`].
pub fn list_term_shards(paths: &ShardPaths) -> IndexResult<Vec<(String, PathBuf)>> {
    if !paths.temp.is_dir() {
        return Err(IndexError::MissingShards(paths.temp.clone()));
    }
    let entries = fs::read_dir(&paths.temp).map_err(|e| IndexError::io(&paths.temp, e))?;
    let mut shards = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IndexError::io(&paths.temp, e))?;
        let path = entry.path();
        if !path.is_file() { continue; }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::warn!(path = %path.display(), "skipping shard with non UTF-8 name");
            continue;
        };
        if let Some(document) = name.strip_suffix(TERM_SHARD_EXT) {
            shards.push((document.to_string(), path));
        }
    }
    if shards.is_empty() {
        return Err(IndexError::MissingShards(paths.temp.clone()));
    }
    shards.sort();
    Ok(shards)
}

/// Write one key's index shard as JSON indented by four spaces, keys sorted.
pub fn save_index_shard(paths: &ShardPaths, key: IndexKey, shard: &InvertedIndexShard) -> IndexResult<PathBuf> {
    ensure_dir(&paths.index)?;
    let file = paths.index_shard(key);
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    shard.serialize(&mut ser).map_err(|e| IndexError::json(&file, e))?;
    write_file(&file, &buf)?;
    Ok(file)
}

pub fn load_index_shard(paths: &ShardPaths, key: IndexKey) -> IndexResult<InvertedIndexShard> {
    let file = paths.index_shard(key);
    let f = File::open(&file).map_err(|e| IndexError::io(&file, e))?;
    serde_json::from_reader(BufReader::new(f)).map_err(|e| IndexError::json(&file, e))
}

/// Remove a directory tree if present.
pub fn remove_dir_if_exists(dir: &Path) -> IndexResult<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(IndexError::io(dir, e)),
    }
}
