use crate::error::{IndexError, IndexResult};
use crate::persist::{save_term_shard, ShardPaths};
use crate::tokenizer::tokenize;
use crate::TermFrequencyShard;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Count normalized terms line by line.
pub fn count_terms<R: BufRead>(reader: R) -> std::io::Result<TermFrequencyShard> {
    let mut counts = TermFrequencyShard::new();
    for line in reader.split(b'\n') {
        for term in tokenize(&line?) {
            *counts.entry(term).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Map one document of `files_dir` into its term shard and persist it under
/// the temp directory. Re-running on unchanged content rewrites identical bytes.
pub fn map_document(files_dir: &Path, paths: &ShardPaths, document: &str) -> IndexResult<TermFrequencyShard> {
    let source = files_dir.join(document);
    let f = File::open(&source).map_err(|e| IndexError::io(&source, e))?;
    let counts = count_terms(BufReader::new(f)).map_err(|e| IndexError::io(&source, e))?;
    let shard = save_term_shard(paths, document, &counts)?;
    tracing::debug!(document, terms = counts.len(), shard = %shard.display(), "mapped document");
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn counts_terms_across_lines() {
        let counts = count_terms(&b"The cat sat.\nThe CAT ran!\nno"[..]).unwrap();
        let expected: TermFrequencyShard = [("cat", 2), ("ran", 1), ("sat", 1), ("the", 2)]
            .into_iter()
            .map(|(t, n)| (t.to_string(), n))
            .collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn rerun_produces_identical_shard() {
        let dir = tempdir().unwrap();
        let files = dir.path().join("files");
        fs::create_dir_all(&files).unwrap();
        fs::write(files.join("a.txt"), "zebra apple mango apple\nZebra").unwrap();
        let paths = ShardPaths::new(dir.path().join("map"), dir.path().join("index"));

        map_document(&files, &paths, "a.txt").unwrap();
        let first = fs::read(paths.term_shard("a.txt")).unwrap();
        map_document(&files, &paths, "a.txt").unwrap();
        let second = fs::read(paths.term_shard("a.txt")).unwrap();
        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first).unwrap(), r#"{"apple":2,"mango":1,"zebra":2}"#);
    }

    #[test]
    fn missing_document_is_an_io_error() {
        let dir = tempdir().unwrap();
        let paths = ShardPaths::new(dir.path().join("map"), dir.path().join("index"));
        let err = map_document(dir.path(), &paths, "ghost.txt").unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }));
        assert!(!paths.temp.exists());
    }
}
